use anyhow::{Context, Error, Result};
use ort::execution_providers;
use ort::session::builder::GraphOptimizationLevel;
pub use ort::session::Session;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_NAME: &str = "face_detector.json";
const WEIGHTS_NAME: &str = "face_detector.onnx";

/// The two files a detector needs: preprocessing/IO config and network weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Input/output contract of the detector network.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub input_name: String,
    pub output_name: String,
    pub input_width: u32,
    pub input_height: u32,
    pub mean: [f32; 3],
    pub scale: f32,
    pub channel_order: ChannelOrder,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            input_name: "data".to_string(),
            output_name: "detection_out".to_string(),
            input_width: 300,
            input_height: 300,
            mean: [104., 117., 123.],
            scale: 1.,
            channel_order: ChannelOrder::Bgr,
        }
    }
}

impl DetectorConfig {
    pub fn load(path: &Path) -> Result<DetectorConfig> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading detector config {}", path.display()))?;
        let config: DetectorConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing detector config {}", path.display()))?;

        if config.input_width == 0 || config.input_height == 0 {
            return Err(Error::msg(format!(
                "detector input size must be non-zero, got {}x{}",
                config.input_width, config.input_height
            )));
        }

        Ok(config)
    }
}

impl ModelFiles {
    /// Locate the model files in `dir`, by fixed name first, then by the
    /// first file carrying the right extension.
    pub fn discover(dir: &Path) -> Result<ModelFiles> {
        let config = find_model_file(dir, CONFIG_NAME, "json")?.ok_or_else(|| {
            Error::msg(format!("no detector config (*.json) in {}", dir.display()))
        })?;
        let weights = find_model_file(dir, WEIGHTS_NAME, "onnx")?.ok_or_else(|| {
            Error::msg(format!("no detector weights (*.onnx) in {}", dir.display()))
        })?;

        debug!("Model config {config:?}, weights {weights:?}");
        Ok(ModelFiles { config, weights })
    }
}

fn find_model_file(dir: &Path, name: &str, extension: &str) -> Result<Option<PathBuf>> {
    let fixed = dir.join(name);
    if fixed.is_file() {
        return Ok(Some(fixed));
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    Ok(candidates.into_iter().next())
}

pub fn initialize_model(weights: &Path, threads: usize) -> Result<Session> {
    ort::init()
        .with_execution_providers([execution_providers::XNNPACKExecutionProvider::default()
            .build()
            .error_on_failure()])
        .commit()?;

    let model = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(threads.max(1))?
        .commit_from_file(weights)
        .with_context(|| format!("loading detector weights {}", weights.display()))?;

    info!("Loaded face detector from {}", weights.display());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_prefers_fixed_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.json", "a.onnx", CONFIG_NAME, WEIGHTS_NAME] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = ModelFiles::discover(dir.path()).unwrap();
        assert_eq!(files.config, dir.path().join(CONFIG_NAME));
        assert_eq!(files.weights, dir.path().join(WEIGHTS_NAME));
    }

    #[test]
    fn discover_falls_back_to_first_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.JSON", "z.onnx", "res10.onnx", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = ModelFiles::discover(dir.path()).unwrap();
        assert_eq!(files.config, dir.path().join("a.JSON"));
        assert_eq!(files.weights, dir.path().join("res10.onnx"));
    }

    #[test]
    fn discover_fails_when_either_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.onnx"), b"x").unwrap();
        assert!(ModelFiles::discover(dir.path()).is_err());

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.json"), b"{}").unwrap();
        assert!(ModelFiles::discover(dir.path()).is_err());
    }

    #[test]
    fn discover_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("weights.onnx")).unwrap();
        fs::write(dir.path().join("model.json"), b"{}").unwrap();
        assert!(ModelFiles::discover(dir.path()).is_err());
    }

    #[test]
    fn config_fields_default_individually() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{ "output_name": "boxes", "channel_order": "rgb" }"#).unwrap();

        let config = DetectorConfig::load(&path).unwrap();
        assert_eq!(config.output_name, "boxes");
        assert_eq!(config.channel_order, ChannelOrder::Rgb);
        assert_eq!(config.input_name, "data");
        assert_eq!((config.input_width, config.input_height), (300, 300));
        assert_eq!(config.mean, [104., 117., 123.]);
    }

    #[test]
    fn config_rejects_zero_input_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{ "input_width": 0 }"#).unwrap();
        assert!(DetectorConfig::load(&path).is_err());
    }
}
