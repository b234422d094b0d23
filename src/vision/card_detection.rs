// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Identity card localisation
//!
//! The detector model regresses a single normalized bounding box
//! `[x1, y1, x2, y2]` (and optionally a confidence score). Post-processing
//! maps it to pixel space and crops, falling back to the untouched image
//! whenever the detection cannot be trusted.

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

use super::preprocessing::preprocess_for_card_detection;

/// Minimum share of the source image a crop must cover
pub const MIN_CARD_AREA_RATIO: f64 = 0.1;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Card detector inference failed: {0}")]
    Inference(String),

    #[error("Unexpected card detector output: {0}")]
    InvalidOutput(String),
}

/// Raw detector output for one image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardDetection {
    /// Normalized `[x1, y1, x2, y2]`, nominally in [0, 1]
    pub bbox: [f32; 4],
    /// Detection confidence (1.0 when the model has no confidence head)
    pub confidence: f32,
}

/// Pixel-space crop rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Image handed on to OCR after card detection
#[derive(Debug, Clone)]
pub struct CardCrop {
    pub image: DynamicImage,
    /// `Some` only when the image was actually cropped
    pub region: Option<CropRegion>,
    pub confidence: f32,
}

impl CardCrop {
    pub fn is_cropped(&self) -> bool {
        self.region.is_some()
    }
}

/// A model that locates the identity card in a photo
pub trait CardDetector: Send + Sync {
    /// Run the model on a full image
    fn predict(&self, image: &DynamicImage) -> Result<CardDetection, DetectionError>;

    /// Short model name for logs and the models endpoint
    fn name(&self) -> &str {
        "card-detector"
    }
}

/// Run `detector` and crop `image` to the card, or return it unchanged
pub fn locate_card(
    detector: &dyn CardDetector,
    image: DynamicImage,
    confidence_threshold: f32,
) -> Result<CardCrop, DetectionError> {
    let detection = detector.predict(&image)?;
    debug!(
        "Card detection: bbox={:?}, confidence={:.3}",
        detection.bbox, detection.confidence
    );
    Ok(crop_to_detection(image, &detection, confidence_threshold))
}

/// Apply a detection to an image
///
/// Never fails: an untrusted or degenerate detection yields the original
/// image with `region: None`.
pub fn crop_to_detection(
    image: DynamicImage,
    detection: &CardDetection,
    confidence_threshold: f32,
) -> CardCrop {
    match detection_region(
        image.width(),
        image.height(),
        detection,
        confidence_threshold,
    ) {
        Some(region) => CardCrop {
            image: image.crop_imm(region.x, region.y, region.width, region.height),
            region: Some(region),
            confidence: detection.confidence,
        },
        None => CardCrop {
            image,
            region: None,
            confidence: detection.confidence,
        },
    }
}

/// Map a normalized detection to a pixel crop rectangle
///
/// Returns `None` when the confidence is below `confidence_threshold` (or not
/// a number), when the clamped box has no area, when it covers less than
/// `MIN_CARD_AREA_RATIO` of the image, or when it spans the whole image.
pub fn detection_region(
    width: u32,
    height: u32,
    detection: &CardDetection,
    confidence_threshold: f32,
) -> Option<CropRegion> {
    if width == 0 || height == 0 {
        return None;
    }

    let confidence = detection.confidence;
    if !confidence.is_finite() || confidence < confidence_threshold {
        return None;
    }
    if detection.bbox.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let (w, h) = (width as i64, height as i64);
    let [bx1, by1, bx2, by2] = detection.bbox;

    // Truncate toward zero, then clamp to the image bounds
    let x1 = ((bx1 * width as f32) as i64).max(0);
    let y1 = ((by1 * height as f32) as i64).max(0);
    let x2 = ((bx2 * width as f32) as i64).min(w);
    let y2 = ((by2 * height as f32) as i64).min(h);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area < MIN_CARD_AREA_RATIO * (w * h) as f64 {
        return None;
    }

    if x1 == 0 && y1 == 0 && x2 == w && y2 == h {
        return None;
    }

    Some(CropRegion {
        x: x1 as u32,
        y: y1 as u32,
        width: (x2 - x1) as u32,
        height: (y2 - y1) as u32,
    })
}

/// ONNX card detector
///
/// Expects input `[1, 224, 224, 3]` (NHWC, pixels scaled to [0, 1]),
/// output 0 a box `[1, 4]` and an optional output 1 confidence `[1, 1]`.
#[derive(Clone)]
pub struct OnnxCardDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Whether the model exposes a confidence output
    has_confidence_output: bool,
}

impl std::fmt::Debug for OnnxCardDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxCardDetector")
            .field("input_name", &self.input_name)
            .field("has_confidence_output", &self.has_confidence_output)
            .finish_non_exhaustive()
    }
}

impl OnnxCardDetector {
    /// Load the card detector from an ONNX file
    ///
    /// # Errors
    /// Returns error if the model file is missing or ONNX Runtime cannot
    /// build a session from it.
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ID detector model not found at {}", model_path.display());
        }

        info!("Loading ID card detector from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(2)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load ID detector model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());
        let has_confidence_output = session.outputs.len() > 1;

        debug!(
            "Card detector loaded - input: {}, outputs: {}",
            input_name,
            session.outputs.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            has_confidence_output,
        })
    }
}

impl CardDetector for OnnxCardDetector {
    fn predict(&self, image: &DynamicImage) -> Result<CardDetection, DetectionError> {
        let input = preprocess_for_card_detection(image);

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("session lock poisoned".to_string()))?;

        let input_value =
            Value::from_array(input).map_err(|e| DetectionError::Inference(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let boxes = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::InvalidOutput(e.to_string()))?;
        let values: Vec<f32> = boxes.iter().copied().take(4).collect();
        if values.len() < 4 {
            return Err(DetectionError::InvalidOutput(format!(
                "expected 4 box coordinates, got {}",
                values.len()
            )));
        }

        let confidence = if self.has_confidence_output {
            let scores = outputs[1]
                .try_extract_array::<f32>()
                .map_err(|e| DetectionError::InvalidOutput(e.to_string()))?;
            scores.iter().copied().next().ok_or_else(|| {
                DetectionError::InvalidOutput("empty confidence output".to_string())
            })?
        } else {
            1.0
        };

        Ok(CardDetection {
            bbox: [values[0], values[1], values[2], values[3]],
            confidence,
        })
    }

    fn name(&self) -> &str {
        "id-detector"
    }
}
