// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for loading the card detector and OCR models

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ScannerConfig;
use crate::vision::card_detection::{CardDetector, OnnxCardDetector};
use crate::vision::ocr::{OcrEngine, PaddleOcrEngine};

/// Configuration for loading vision models
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// Card detector ONNX file (optional)
    pub card_detector_model: Option<PathBuf>,
    /// PaddleOCR model directory (optional)
    pub ocr_model_dir: Option<PathBuf>,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            card_detector_model: Some(PathBuf::from("data/models/id_detector.onnx")),
            ocr_model_dir: Some(PathBuf::from("data/models/paddleocr-onnx")),
        }
    }
}

impl From<&ScannerConfig> for VisionModelConfig {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            card_detector_model: Some(config.id_detector_model.clone()),
            ocr_model_dir: Some(config.ocr_model_dir.clone()),
        }
    }
}

/// Information about a loaded model, as reported by `GET /api/v1/models`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VisionModelInfo {
    pub name: String,
    /// Model type (card_detection, ocr)
    pub model_type: String,
    pub available: bool,
}

/// Holds whichever vision models loaded at startup
///
/// A missing or broken model is logged and left empty; requests that need
/// it are rejected with 503 instead of the process failing to start.
#[derive(Clone, Default)]
pub struct VisionModelManager {
    card_detector: Option<Arc<dyn CardDetector>>,
    ocr_engine: Option<Arc<dyn OcrEngine>>,
}

impl VisionModelManager {
    pub async fn new(config: VisionModelConfig) -> anyhow::Result<Self> {
        let card_detector: Option<Arc<dyn CardDetector>> =
            if let Some(ref path) = config.card_detector_model {
                match OnnxCardDetector::new(path).await {
                    Ok(model) => {
                        tracing::info!("Card detector loaded from {}", path.display());
                        Some(Arc::new(model))
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Failed to load card detector from {}: {:#}",
                            path.display(),
                            e
                        );
                        None
                    }
                }
            } else {
                None
            };

        let ocr_engine: Option<Arc<dyn OcrEngine>> = if let Some(ref dir) = config.ocr_model_dir
        {
            match PaddleOcrEngine::new(dir).await {
                Ok(engine) => {
                    tracing::info!("PaddleOCR models loaded from {}", dir.display());
                    Some(Arc::new(engine))
                }
                Err(e) => {
                    tracing::warn!("Failed to load OCR models from {}: {:#}", dir.display(), e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            card_detector,
            ocr_engine,
        })
    }

    /// Build a manager from already constructed components
    pub fn from_parts(
        card_detector: Option<Arc<dyn CardDetector>>,
        ocr_engine: Option<Arc<dyn OcrEngine>>,
    ) -> Self {
        Self {
            card_detector,
            ocr_engine,
        }
    }

    pub fn card_detector(&self) -> Option<Arc<dyn CardDetector>> {
        self.card_detector.clone()
    }

    pub fn ocr_engine(&self) -> Option<Arc<dyn OcrEngine>> {
        self.ocr_engine.clone()
    }

    pub fn has_card_detector(&self) -> bool {
        self.card_detector.is_some()
    }

    pub fn has_ocr(&self) -> bool {
        self.ocr_engine.is_some()
    }

    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        vec![
            VisionModelInfo {
                name: self
                    .card_detector
                    .as_ref()
                    .map(|d| d.name().to_string())
                    .unwrap_or_else(|| "id-detector".to_string()),
                model_type: "card_detection".to_string(),
                available: self.card_detector.is_some(),
            },
            VisionModelInfo {
                name: self
                    .ocr_engine
                    .as_ref()
                    .map(|o| o.name().to_string())
                    .unwrap_or_else(|| "paddleocr".to_string()),
                model_type: "ocr".to_string(),
                available: self.ocr_engine.is_some(),
            },
        ]
    }
}

impl std::fmt::Debug for VisionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionModelManager")
            .field("card_detector", &self.has_card_detector())
            .field("ocr_engine", &self.has_ocr())
            .finish()
    }
}
