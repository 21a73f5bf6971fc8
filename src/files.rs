use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: [&str; 8] = [
    "jpg", "jpeg", "png", "bmp", "tiff", "webp", "gif", "heic",
];

/// A source image and the folder it was found in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageFile {
    pub path: PathBuf,
    pub folder: PathBuf,
}

pub type ImageGroups = BTreeMap<PathBuf, Vec<ImageFile>>;

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Recursively collect images under `root`, keyed by containing folder.
///
/// Keys and the files within each group are sorted, so repeated runs over
/// the same tree visit images in the same order.
pub fn group_images(root: &Path) -> Result<ImageGroups> {
    let mut groups = ImageGroups::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_image(path) {
            trace!("Skipping non-image file {}", path.display());
            continue;
        }

        let folder = path.parent().unwrap_or(root).to_path_buf();
        groups.entry(folder.clone()).or_default().push(ImageFile {
            path: path.to_path_buf(),
            folder,
        });
    }

    for files in groups.values_mut() {
        files.sort();
    }

    debug!(
        "Found {} images in {} folders under {}",
        groups.values().map(Vec::len).sum::<usize>(),
        groups.len(),
        root.display()
    );

    Ok(groups)
}
