use anyhow::{Context, Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const INCREMENT_BASE: &str = "Faces Output";

/// How the destination root of a run is named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputNaming {
    /// `"<input name> (output)"`. An existing directory of that name is reused
    /// only while it holds no files.
    #[default]
    Suffix,
    /// `"Faces Output (N)"` with the first `N` not already taken.
    Increment,
}

/// What to do with the destination root when a run extracted no faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CleanupPolicy {
    #[default]
    RemoveIfEmpty,
    Keep,
}

/// Destination root handed out to a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRoot {
    pub path: PathBuf,
    /// True when this run created the directory. Only such roots are removed.
    pub created: bool,
}

/// Pick the destination root for a run over `input` and create it.
///
/// Never hands out a directory that already holds files, so one run cannot
/// mix its crops with another run's output or clean it up.
pub fn allocate(input: &Path, parent: &Path, naming: OutputNaming) -> Result<OutputRoot> {
    let path = match naming {
        OutputNaming::Suffix => {
            let name = input.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
                Error::msg(format!("cannot name output after {}", input.display()))
            })?;
            parent.join(format!("{name} (output)"))
        }
        OutputNaming::Increment => (1..)
            .map(|n| parent.join(format!("{INCREMENT_BASE} ({n})")))
            .find(|candidate| !candidate.exists())
            .ok_or_else(|| Error::msg("no free output directory name"))?,
    };

    let created = !path.exists();
    if !created && holds_files(&path)? {
        return Err(Error::msg(format!(
            "{} already holds files; move it away or use increment naming",
            path.display()
        )));
    }

    fs::create_dir_all(&path).with_context(|| format!("creating {}", path.display()))?;
    debug!("Output directory {} (created: {created})", path.display());

    Ok(OutputRoot { path, created })
}

fn holds_files(dir: &Path) -> Result<bool> {
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if !entry.file_type().is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Apply `policy` to `root` after a run; returns whether the directory remains.
pub fn finish(root: &OutputRoot, faces_extracted: usize, policy: CleanupPolicy) -> Result<bool> {
    if faces_extracted > 0 || policy == CleanupPolicy::Keep || !root.created {
        return Ok(true);
    }

    let dest = &root.path;
    fs::remove_dir_all(dest).with_context(|| format!("removing {}", dest.display()))?;
    info!("No faces extracted, removed {}", dest.display());

    Ok(false)
}
