// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Card localisation and cropping

use id_card_scanner::vision::{
    card_detection::{crop_to_detection, detection_region},
    locate_card, CardDetection, CardDetector, CropRegion, DetectionError, OnnxCardDetector,
};
use image::{DynamicImage, Rgb, RgbImage};

const THRESHOLD: f32 = 0.7;

struct BrokenDetector;

impl CardDetector for BrokenDetector {
    fn predict(&self, _image: &DynamicImage) -> Result<CardDetection, DetectionError> {
        Err(DetectionError::Inference("no session".to_string()))
    }
}

struct FixedDetector(CardDetection);

impl CardDetector for FixedDetector {
    fn predict(&self, _image: &DynamicImage) -> Result<CardDetection, DetectionError> {
        Ok(self.0)
    }
}

fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 120, 150])))
}

fn detection(bbox: [f32; 4], confidence: f32) -> CardDetection {
    CardDetection { bbox, confidence }
}

#[test]
fn test_confident_detection_crops() {
    let card = detection([0.125, 0.25, 0.875, 0.75], 0.92);
    let crop = crop_to_detection(photo(1000, 600), &card, THRESHOLD);

    assert!(crop.is_cropped());
    assert_eq!(
        crop.region,
        Some(CropRegion {
            x: 125,
            y: 150,
            width: 750,
            height: 300,
        })
    );
    assert_eq!((crop.image.width(), crop.image.height()), (750, 300));
}

#[test]
fn test_low_confidence_keeps_original() {
    let unsure = detection([0.25, 0.25, 0.75, 0.75], 0.5);
    let crop = crop_to_detection(photo(640, 480), &unsure, THRESHOLD);

    assert!(!crop.is_cropped());
    assert_eq!((crop.image.width(), crop.image.height()), (640, 480));
}

#[test]
fn test_threshold_is_inclusive() {
    let borderline = detection([0.25, 0.25, 0.75, 0.75], THRESHOLD);
    let region = detection_region(100, 100, &borderline, THRESHOLD);
    assert!(region.is_some());
}

#[test]
fn test_full_frame_is_not_a_crop() {
    let everything = detection([0.0, 0.0, 1.0, 1.0], 0.99);
    let crop = crop_to_detection(photo(300, 200), &everything, THRESHOLD);
    assert!(!crop.is_cropped());
}

#[test]
fn test_box_outside_image_is_clamped() {
    let region = detection_region(200, 100, &detection([-0.2, 0.5, 0.5, 1.4], 0.9), THRESHOLD);
    assert_eq!(
        region,
        Some(CropRegion {
            x: 0,
            y: 50,
            width: 100,
            height: 50,
        })
    );
}

#[test]
fn test_degenerate_boxes_rejected() {
    let inverted = detection([0.8, 0.8, 0.2, 0.2], 0.9);
    assert!(detection_region(100, 100, &inverted, THRESHOLD).is_none());

    // 4% of the frame
    let tiny = detection([0.0, 0.0, 0.2, 0.2], 0.9);
    assert!(detection_region(100, 100, &tiny, THRESHOLD).is_none());

    let nan = detection([0.1, 0.1, 0.9, 0.9], f32::NAN);
    assert!(detection_region(100, 100, &nan, THRESHOLD).is_none());

    let nan_box = detection([f32::NAN, 0.1, 0.9, 0.9], 0.9);
    assert!(detection_region(100, 100, &nan_box, THRESHOLD).is_none());
}

#[test]
fn test_locate_card_uses_detector() {
    let detector = FixedDetector(detection([0.25, 0.25, 0.75, 0.75], 0.8));
    let crop = locate_card(&detector, photo(400, 400), THRESHOLD).unwrap();

    assert!(crop.is_cropped());
    assert_eq!((crop.image.width(), crop.image.height()), (200, 200));
    assert!((crop.confidence - 0.8).abs() < f32::EPSILON);
}

#[test]
fn test_locate_card_propagates_inference_errors() {
    let result = locate_card(&BrokenDetector, photo(32, 32), THRESHOLD);
    assert!(matches!(result, Err(DetectionError::Inference(_))));
}

#[tokio::test]
async fn test_onnx_detector_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = OnnxCardDetector::new(dir.path().join("id_detector.onnx")).await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
#[ignore] // Requires data/models/id_detector.onnx
async fn test_onnx_detector_real_model() {
    let path = std::env::var("ID_DETECTOR_MODEL")
        .unwrap_or_else(|_| "data/models/id_detector.onnx".to_string());
    let detector = OnnxCardDetector::new(&path).await.unwrap();

    let result = detector.predict(&photo(640, 400)).unwrap();
    assert!(result.confidence.is_finite());
    assert!(result.bbox.iter().all(|v| v.is_finite()));
}
