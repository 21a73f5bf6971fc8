use anyhow::{Context, Error, Result};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ImageSkip;

/// File names for `count` crops cut from `source`.
///
/// A lone crop takes the source's own name; several crops are numbered from 1
/// in the order given. The extension is always lower-cased.
pub fn output_names(source: &Path, count: usize) -> Result<Vec<String>> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::msg(format!("{} has no usable file name", source.display())))?;
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();

    Ok(match count {
        0 => Vec::new(),
        1 => vec![format!("{stem}{ext}")],
        n => (1..=n).map(|i| format!("{stem}({i}){ext}")).collect(),
    })
}

/// Write the crops of one source image into `dest`, returning how many files
/// were written. On failure the error still carries the count saved so far.
pub fn write_group(source: &Path, crops: &[RgbImage], dest: &Path) -> Result<usize, ImageSkip> {
    if crops.is_empty() {
        return Ok(0);
    }

    let failed = |written: usize, cause: Error| ImageSkip::Write { written, cause };

    fs::create_dir_all(dest)
        .with_context(|| format!("creating {}", dest.display()))
        .map_err(|e| failed(0, e))?;

    let names = output_names(source, crops.len()).map_err(|e| failed(0, e))?;
    for (written, (crop, name)) in crops.iter().zip(&names).enumerate() {
        let out: PathBuf = dest.join(name);
        crop.save(&out)
            .with_context(|| format!("writing {}", out.display()))
            .map_err(|e| failed(written, e))?;
        debug!("Wrote {}x{} crop to {}", crop.width(), crop.height(), out.display());
    }

    Ok(names.len())
}
