//! Detect faces across a directory tree of images and write a margin-padded
//! crop of each one into a mirrored output tree.

pub mod error;
pub mod files;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod shapes;
pub mod writer;

pub use error::ImageSkip;
pub use pipeline::detection::{FaceDetector, RawDetection, SsdFaceDetector};
pub use pipeline::{Pipeline, RunCounters, RunOptions, RunSummary};
