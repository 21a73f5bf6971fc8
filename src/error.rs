use thiserror::Error;

/// Why processing of a visited image stopped short.
#[derive(Debug, Error)]
pub enum ImageSkip {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("face detector failed: {0:#}")]
    Detector(anyhow::Error),

    #[error("failed to write crops after saving {written}: {cause:#}")]
    Write { written: usize, cause: anyhow::Error },
}

impl ImageSkip {
    /// Crops that reached the disk before the image was given up on.
    pub fn faces_written(&self) -> usize {
        match self {
            ImageSkip::Write { written, .. } => *written,
            _ => 0,
        }
    }
}
