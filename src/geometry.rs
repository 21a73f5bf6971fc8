//! Turns raw detector output into crop rectangles that are safe to cut out of
//! the source image.

use crate::pipeline::detection::{FaceDetector, RawDetection};
use crate::shapes::rect::Rect;
use image::RgbImage;
use tracing::trace;

/// Detections at or below this confidence are dropped.
pub const MIN_CONFIDENCE: f32 = 0.7;

/// Padding added on every side of a face, as a fraction of its size.
pub const MARGIN: f64 = 0.2;

/// Result of looking for faces in one image.
#[derive(Debug)]
pub enum FaceScan {
    /// Crop regions in detector order. Empty when nothing qualified.
    Found(Vec<Rect>),
    DetectorFailed(anyhow::Error),
}

/// Run the detector and convert what it reports into crop regions.
pub fn scan(detector: &dyn FaceDetector, img: &RgbImage) -> FaceScan {
    match detector.detect(img) {
        Ok(detections) => FaceScan::Found(crop_regions(&detections, img.width(), img.height())),
        Err(e) => FaceScan::DetectorFailed(e),
    }
}

pub fn crop_regions(detections: &[RawDetection], width: u32, height: u32) -> Vec<Rect> {
    detections
        .iter()
        .filter_map(|d| face_box(d, width, height))
        .map(|face| {
            let region = with_margin(&face, width, height);
            trace!("face {face:?} -> crop {region:?}");
            region
        })
        .collect()
}

/// Clamp a qualifying detection to the image, dropping it if nothing is left.
pub fn face_box(det: &RawDetection, width: u32, height: u32) -> Option<Rect> {
    let qualifies = det.confidence > MIN_CONFIDENCE;
    if !qualifies {
        return None;
    }

    // float -> int casts truncate toward zero and saturate, NaN becomes 0
    let x1 = (det.x1 as i64).max(0);
    let y1 = (det.y1 as i64).max(0);
    let x2 = (det.x2 as i64).min(width as i64);
    let y2 = (det.y2 as i64).min(height as i64);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Rect::from_corners(x1 as u32, y1 as u32, x2 as u32, y2 as u32)
}

pub fn with_margin(face: &Rect, width: u32, height: u32) -> Rect {
    let dx = (face.w as f64 * MARGIN).floor() as u32;
    let dy = (face.h as f64 * MARGIN).floor() as u32;
    face.expand(dx, dy, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Error;

    fn det(confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> RawDetection {
        RawDetection {
            confidence,
            x1,
            y1,
            x2,
            y2,
        }
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(face_box(&det(0.7, 10., 10., 50., 50.), 100, 100), None);
        assert_eq!(face_box(&det(0.5, 10., 10., 50., 50.), 100, 100), None);
        assert_eq!(
            face_box(&det(0.70001, 10., 10., 50., 50.), 100, 100),
            Some(Rect::new(10, 10, 40, 40))
        );
    }

    #[test]
    fn nan_confidence_is_dropped() {
        assert_eq!(face_box(&det(f32::NAN, 10., 10., 50., 50.), 100, 100), None);
    }

    #[test]
    fn coordinates_are_truncated_then_clamped() {
        assert_eq!(
            face_box(&det(0.9, -12.7, 3.9, 130.2, 80.99), 100, 100),
            Some(Rect::new(0, 3, 100, 77))
        );
    }

    #[test]
    fn inverted_or_outside_boxes_are_discarded() {
        assert_eq!(face_box(&det(0.9, 50., 10., 20., 40.), 100, 100), None);
        assert_eq!(face_box(&det(0.9, 10., 40., 20., 40.), 100, 100), None);
        assert_eq!(face_box(&det(0.9, 120., 10., 150., 40.), 100, 100), None);
        assert_eq!(face_box(&det(0.9, -30., -30., -5., -5.), 100, 100), None);
    }

    #[test]
    fn margin_is_twenty_percent_floored_per_axis() {
        // 33 * 0.2 = 6.6 -> 6, 47 * 0.2 = 9.4 -> 9
        let region = with_margin(&Rect::new(40, 40, 33, 47), 200, 200);
        assert_eq!(region, Rect::new(34, 31, 45, 65));
    }

    #[test]
    fn margin_is_clamped_at_image_edges() {
        let region = with_margin(&Rect::new(2, 90, 50, 10), 60, 100);
        // dx = 10, dy = 2
        assert_eq!(region, Rect::new(0, 88, 60, 12));
    }

    #[test]
    fn crop_regions_never_leave_the_image() {
        let (width, height) = (64, 48);
        let mut detections = Vec::new();
        for i in -3..12 {
            for j in -3..12 {
                let x1 = i as f32 * 7.3;
                let y1 = j as f32 * 5.1;
                detections.push(det(0.95, x1, y1, x1 + 23.4, y1 + 31.7));
            }
        }

        let regions = crop_regions(&detections, width, height);
        assert!(!regions.is_empty());
        for r in regions {
            assert!(r.w > 0 && r.h > 0);
            assert!(r.w <= width && r.h <= height);
            assert!(r.fits_within(width, height), "{r:?}");
        }
    }

    #[test]
    fn crop_regions_keep_detector_order() {
        let detections = [
            det(0.8, 60., 10., 80., 30.),
            det(0.2, 0., 0., 10., 10.),
            det(0.95, 10., 10., 30., 30.),
        ];
        let regions = crop_regions(&detections, 100, 100);
        assert_eq!(regions, vec![Rect::new(56, 6, 28, 28), Rect::new(6, 6, 28, 28)]);
    }

    struct Failing;

    impl FaceDetector for Failing {
        fn detect(&self, _img: &RgbImage) -> anyhow::Result<Vec<RawDetection>> {
            Err(Error::msg("inference blew up"))
        }
    }

    struct Fixed(Vec<RawDetection>);

    impl FaceDetector for Fixed {
        fn detect(&self, _img: &RgbImage) -> anyhow::Result<Vec<RawDetection>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn scan_distinguishes_failure_from_no_faces() {
        let img = RgbImage::new(20, 20);

        assert!(matches!(scan(&Failing, &img), FaceScan::DetectorFailed(_)));

        match scan(&Fixed(vec![det(0.3, 0., 0., 5., 5.)]), &img) {
            FaceScan::Found(regions) => assert!(regions.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
