// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model loading at startup

use id_card_scanner::config::ScannerConfig;
use id_card_scanner::vision::{
    CardDetection, CardDetector, DetectionError, VisionModelConfig, VisionModelManager,
};
use image::DynamicImage;
use std::sync::Arc;

struct StubDetector;

impl CardDetector for StubDetector {
    fn predict(&self, _image: &DynamicImage) -> Result<CardDetection, DetectionError> {
        Ok(CardDetection {
            bbox: [0.0, 0.0, 1.0, 1.0],
            confidence: 1.0,
        })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[tokio::test]
async fn test_missing_model_files_do_not_fail_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = VisionModelConfig {
        card_detector_model: Some(dir.path().join("missing.onnx")),
        ocr_model_dir: Some(dir.path().join("paddleocr-onnx")),
    };

    let manager = VisionModelManager::new(config).await.unwrap();

    assert!(!manager.has_card_detector());
    assert!(!manager.has_ocr());
    assert!(manager.card_detector().is_none());
    assert!(manager.ocr_engine().is_none());
}

#[tokio::test]
async fn test_unconfigured_models_are_skipped() {
    let config = VisionModelConfig {
        card_detector_model: None,
        ocr_model_dir: None,
    };

    let manager = VisionModelManager::new(config).await.unwrap();
    let models = manager.list_models();

    assert_eq!(models.len(), 2);
    assert!(models.iter().all(|m| !m.available));
}

#[test]
fn test_config_paths_follow_scanner_config() {
    let scanner = ScannerConfig {
        id_detector_model: "/models/card.onnx".into(),
        ocr_model_dir: "/models/ocr".into(),
        ..Default::default()
    };

    let config = VisionModelConfig::from(&scanner);
    assert_eq!(config.card_detector_model.unwrap().to_str(), Some("/models/card.onnx"));
    assert_eq!(config.ocr_model_dir.unwrap().to_str(), Some("/models/ocr"));
}

#[test]
fn test_from_parts_reports_component_names() {
    let manager = VisionModelManager::from_parts(Some(Arc::new(StubDetector)), None);
    let models = manager.list_models();

    let detector = models.iter().find(|m| m.model_type == "card_detection").unwrap();
    assert_eq!(detector.name, "stub");
    assert!(detector.available);

    let ocr = models.iter().find(|m| m.model_type == "ocr").unwrap();
    assert_eq!(ocr.name, "paddleocr");
    assert!(!ocr.available);
}

#[test]
fn test_debug_shows_availability_only() {
    let manager = VisionModelManager::from_parts(Some(Arc::new(StubDetector)), None);
    let debug = format!("{:?}", manager);
    assert!(debug.contains("card_detector: true"));
    assert!(debug.contains("ocr_engine: false"));
}
