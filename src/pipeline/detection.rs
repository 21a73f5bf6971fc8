use super::model::{ChannelOrder, DetectorConfig, ModelFiles, Session, initialize_model};
use anyhow::{Error, Result};
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array;
use ort::value::Tensor;
use tracing::{span, trace, Level};

/// Values per detection row: image id, label, confidence, x1, y1, x2, y2.
const ROW_LEN: usize = 7;

/// One candidate face as reported by a detector, in the pixel space of the
/// image handed to it. Coordinates may fall outside the image or be inverted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

pub trait FaceDetector {
    /// Candidate faces in the order the model reports them.
    fn detect(&self, img: &RgbImage) -> Result<Vec<RawDetection>>;
}

/// Single-shot face detector run through ONNX Runtime.
///
/// Model input: NCHW f32 image of the configured size, mean subtracted.
/// Model output: `[1, 1, N, 7]` rows of
/// `[image_id, label, confidence, x1, y1, x2, y2]`, corners normalised to 0..1.
pub struct SsdFaceDetector {
    model: Session,
    config: DetectorConfig,
}

impl SsdFaceDetector {
    pub fn new(files: &ModelFiles, threads: usize) -> Result<SsdFaceDetector> {
        let config = DetectorConfig::load(&files.config)?;
        Ok(SsdFaceDetector {
            model: initialize_model(&files.weights, threads)?,
            config,
        })
    }
}

impl FaceDetector for SsdFaceDetector {
    fn detect(&self, img: &RgbImage) -> Result<Vec<RawDetection>> {
        let span = span!(Level::DEBUG, "face_detector");
        let _guard = span.enter();

        let cfg = &self.config;
        let resized = imageops::resize(
            img,
            cfg.input_width,
            cfg.input_height,
            FilterType::Triangle,
        );

        let input_arr = Array::from_shape_fn(
            (1, 3, cfg.input_height as usize, cfg.input_width as usize),
            |(_, c, y, x)| {
                let channel = match cfg.channel_order {
                    ChannelOrder::Rgb => c,
                    ChannelOrder::Bgr => 2 - c,
                };
                let value = resized.get_pixel(x as u32, y as u32)[channel] as f32;
                (value - cfg.mean[c]) * cfg.scale
            },
        );
        let input = Tensor::from_array(input_arr)?;

        let outputs = self
            .model
            .run(ort::inputs![cfg.input_name.as_str() => input]?)?;
        let output = outputs[cfg.output_name.as_str()].try_extract_tensor::<f32>()?;
        let values: Vec<f32> = output.iter().copied().collect();

        let detections = decode_rows(&values, img.width(), img.height())?;
        trace!("Model reported {} candidates", detections.len());

        Ok(detections)
    }
}

/// Turn flat detection rows into pixel-space detections for a
/// `width` x `height` image, keeping row order.
pub fn decode_rows(values: &[f32], width: u32, height: u32) -> Result<Vec<RawDetection>> {
    if values.len() % ROW_LEN != 0 {
        return Err(Error::msg(format!(
            "malformed detection output: {} values is not a multiple of {ROW_LEN}",
            values.len()
        )));
    }

    let (w, h) = (width as f32, height as f32);
    Ok(values
        .chunks_exact(ROW_LEN)
        .map(|row| RawDetection {
            confidence: row[2],
            x1: row[3] * w,
            y1: row[4] * h,
            x2: row[5] * w,
            y2: row[6] * h,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_scales_to_image_space_in_row_order() {
        let values = [
            0., 1., 0.9, 0.1, 0.2, 0.5, 0.6, //
            0., 1., 0.3, -0.1, 0.0, 1.2, 1.0,
        ];
        let dets = decode_rows(&values, 200, 100).unwrap();

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].confidence, 0.9);
        assert!((dets[0].x1 - 20.).abs() < 1e-4);
        assert!((dets[0].y1 - 20.).abs() < 1e-4);
        assert!((dets[0].x2 - 100.).abs() < 1e-4);
        assert!((dets[0].y2 - 60.).abs() < 1e-4);
        assert_eq!(dets[1].confidence, 0.3);
        assert!(dets[1].x1 < 0.);
        assert!(dets[1].x2 > 200.);
    }

    #[test]
    fn decode_empty_output() {
        assert!(decode_rows(&[], 10, 10).unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_partial_rows() {
        assert!(decode_rows(&[0., 1., 0.9, 0.1], 10, 10).is_err());
    }
}
