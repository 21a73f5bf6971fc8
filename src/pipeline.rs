use anyhow::{Context, Error, Result};
use image::imageops;
use image::RgbImage;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, span, warn, Level};

use crate::error::ImageSkip;
use crate::files::{self, ImageFile};
use crate::geometry::{self, FaceScan};
use crate::output::{self, CleanupPolicy, OutputNaming};
use crate::writer;
use detection::FaceDetector;

pub mod detection;
pub mod model;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub naming: OutputNaming,
    pub cleanup: CleanupPolicy,
    /// Directory the output root is created in. Defaults to the input's parent.
    pub output_parent: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Every image visited, whether or not faces were found in it.
    pub images_processed: usize,
    pub faces_extracted: usize,
}

impl RunCounters {
    fn record(self, faces: usize) -> RunCounters {
        RunCounters {
            images_processed: self.images_processed + 1,
            faces_extracted: self.faces_extracted + faces,
        }
    }
}

#[derive(Debug)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: ImageSkip,
}

#[derive(Debug)]
pub struct RunSummary {
    pub counters: RunCounters,
    pub output_dir: PathBuf,
    /// False when the output root was removed because no faces were extracted.
    pub output_kept: bool,
    pub skipped: Vec<SkippedImage>,
}

pub struct Pipeline {
    face_detector: Box<dyn FaceDetector>,
}

impl Pipeline {
    pub fn new(face_detector: Box<dyn FaceDetector>) -> Pipeline {
        Pipeline { face_detector }
    }

    /// Crop every face found under `input` into a freshly allocated output tree
    /// mirroring its folder layout.
    pub fn run(&self, input: &Path, options: &RunOptions) -> Result<RunSummary> {
        let span = span!(Level::INFO, "run");
        let _guard = span.enter();

        if !input.is_dir() {
            return Err(Error::msg(format!("{} is not a directory", input.display())));
        }
        let input = input
            .canonicalize()
            .with_context(|| format!("resolving {}", input.display()))?;

        let parent = match &options.output_parent {
            Some(p) => p.clone(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_else(|| input.clone()),
        };
        let root = output::allocate(&input, &parent, options.naming)?;

        let groups = files::group_images(&input)?;
        info!("Processing {} folders from {}", groups.len(), input.display());

        let mut counters = RunCounters::default();
        let mut skipped = Vec::new();

        for (folder, images) in &groups {
            let relative = folder
                .strip_prefix(&input)
                .with_context(|| format!("{} is outside {}", folder.display(), input.display()))?;
            let dest_folder = root.path.join(relative);
            fs::create_dir_all(&dest_folder)
                .with_context(|| format!("creating {}", dest_folder.display()))?;

            for image in images {
                let faces = match self.process_image(image, &dest_folder) {
                    Ok(faces) => faces,
                    Err(reason) => {
                        warn!("Skipping {}: {reason}", image.path.display());
                        let written = reason.faces_written();
                        skipped.push(SkippedImage {
                            path: image.path.clone(),
                            reason,
                        });
                        written
                    }
                };
                counters = counters.record(faces);
            }
        }

        let output_kept = output::finish(&root, counters.faces_extracted, options.cleanup)?;
        info!(
            "Processed {} images, extracted {} faces",
            counters.images_processed, counters.faces_extracted
        );

        Ok(RunSummary {
            counters,
            output_dir: root.path,
            output_kept,
            skipped,
        })
    }

    fn process_image(&self, image: &ImageFile, dest: &Path) -> Result<usize, ImageSkip> {
        let span = span!(Level::DEBUG, "process_image", path = %image.path.display());
        let _guard = span.enter();

        let img = image::open(&image.path)?.into_rgb8();

        let regions = match geometry::scan(self.face_detector.as_ref(), &img) {
            FaceScan::Found(regions) => regions,
            FaceScan::DetectorFailed(e) => return Err(ImageSkip::Detector(e)),
        };
        debug!("{} faces", regions.len());

        let crops: Vec<RgbImage> = regions
            .iter()
            .map(|r| imageops::crop_imm(&img, r.x, r.y, r.w, r.h).to_image())
            .collect();

        writer::write_group(&image.path, &crops, dest)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(36);
        writeln!(f, "{rule}")?;

        if self.counters.images_processed == 0 {
            writeln!(f, "No images found")?;
        } else {
            writeln!(f, "Processed images: {}", self.counters.images_processed)?;
            if self.counters.faces_extracted > 0 {
                writeln!(f, "Processed faces: {}", self.counters.faces_extracted)?;
            } else {
                writeln!(f, "No faces found")?;
            }
        }

        if self.output_kept {
            writeln!(f, "Output: {}", self.output_dir.display())?;
        }

        write!(f, "{rule}")
    }
}
