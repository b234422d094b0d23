// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Full-document OCR built from the detection and recognition models

use anyhow::Result;
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::detection::{OcrDetectionModel, TextBox};
use super::preprocessing::{preprocess_for_detection, preprocess_for_recognition};
use super::recognition::OcrRecognitionModel;

/// Expected model file names within the OCR model directory
pub const DETECTION_MODEL_FILE: &str = "det_model.onnx";
pub const RECOGNITION_MODEL_FILE: &str = "rec_model.onnx";
pub const DICTIONARY_FILE: &str = "ppocr_keys_v1.txt";

/// Regions recognized with less confidence than this are dropped
const MIN_LINE_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR inference failed: {0}")]
    Inference(String),

    #[error("OCR input image is empty")]
    EmptyImage,
}

/// Text extraction over a whole document image
pub trait OcrEngine: Send + Sync {
    /// Read all text in reading order, one line per row of text joined
    /// with `\n`. Returns an empty string when nothing is found.
    ///
    /// `language` is a hint only; engines may ignore it.
    fn extract_text(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError>;

    fn name(&self) -> &str {
        "ocr"
    }
}

/// A recognized region in source image coordinates
#[derive(Debug, Clone)]
pub struct TextRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub text: String,
}

/// PaddleOCR (PP-OCR) detection + recognition pipeline on ONNX Runtime
#[derive(Clone, Debug)]
pub struct PaddleOcrEngine {
    detector: OcrDetectionModel,
    recognizer: OcrRecognitionModel,
}

impl PaddleOcrEngine {
    /// Load both models and the dictionary from `model_dir`
    pub async fn new<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        info!("Loading PaddleOCR models from {}", model_dir.display());

        let detector = OcrDetectionModel::new(model_dir.join(DETECTION_MODEL_FILE)).await?;
        let recognizer = OcrRecognitionModel::new(
            model_dir.join(RECOGNITION_MODEL_FILE),
            model_dir.join(DICTIONARY_FILE),
        )
        .await?;

        Ok(Self {
            detector,
            recognizer,
        })
    }

    fn recognize_regions(&self, image: &DynamicImage) -> anyhow::Result<Vec<TextRegion>> {
        let (tensor, letterbox) = preprocess_for_detection(image);
        let boxes: Vec<TextBox> = self.detector.detect(&tensor)?;

        let mut regions = Vec::with_capacity(boxes.len());
        for text_box in boxes.iter().filter(|b| b.is_valid()) {
            let Some((x, y, width, height)) = letterbox.map_box_to_original(
                text_box.x,
                text_box.y,
                text_box.width,
                text_box.height,
            ) else {
                continue;
            };

            let crop = image.crop_imm(x, y, width, height);
            let recognized = self
                .recognizer
                .recognize(&preprocess_for_recognition(&crop))?;

            if recognized.is_empty() || recognized.confidence < MIN_LINE_CONFIDENCE {
                debug!(
                    "Dropping region at ({}, {}) with confidence {:.2}",
                    x, y, recognized.confidence
                );
                continue;
            }

            regions.push(TextRegion {
                x,
                y,
                width,
                height,
                text: recognized.text,
            });
        }

        Ok(regions)
    }
}

impl OcrEngine for PaddleOcrEngine {
    fn extract_text(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::EmptyImage);
        }

        let regions = self.recognize_regions(image).map_err(|e| {
            warn!("PaddleOCR failed: {:#}", e);
            OcrError::Inference(format!("{:#}", e))
        })?;

        debug!(
            "PaddleOCR recognized {} regions (language hint: {})",
            regions.len(),
            language
        );
        Ok(assemble_lines(regions))
    }

    fn name(&self) -> &str {
        "paddleocr"
    }
}

/// Group regions into text rows and join them top to bottom
///
/// A region joins the current row when its vertical centre falls inside the
/// row's first region. Within a row, regions are ordered left to right and
/// separated by a single space.
pub fn assemble_lines(mut regions: Vec<TextRegion>) -> String {
    regions.sort_by(|a, b| (a.y, a.x).cmp(&(b.y, b.x)));

    let mut rows: Vec<(u32, u32, Vec<TextRegion>)> = Vec::new();
    for region in regions {
        let center = region.y + region.height / 2;
        match rows.last_mut() {
            Some((top, bottom, row)) if center >= *top && center < *bottom => row.push(region),
            _ => rows.push((region.y, region.y + region.height.max(1), vec![region])),
        }
    }

    rows.into_iter()
        .map(|(_, _, mut row)| {
            row.sort_by_key(|r| r.x);
            row.iter()
                .map(|r| r.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
