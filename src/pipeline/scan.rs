// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scan orchestration
//!
//! Stages run in order: validate, assign a scan id, persist the audit copy,
//! decode, locate the card, preprocess, OCR, resolve the language, extract
//! fields, assemble the response. CPU-bound stages run on the blocking pool.

use image::DynamicImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::result::ScanResponse;
use super::upload::{validate_upload, UploadRejection, UploadedFile};
use crate::config::ScannerConfig;
use crate::storage::UploadStore;
use crate::text::{is_auto, ExtractionError, InfoExtractor, LanguageDetector, AUTO_LANGUAGE};
use crate::vision::card_detection::{locate_card, CardDetector, DetectionError};
use crate::vision::image_utils::{load_image, ImageError, ImageInfo};
use crate::vision::model_manager::VisionModelManager;
use crate::vision::ocr::{OcrEngine, OcrError};
use crate::vision::preprocessing::preprocess_for_ocr;

/// Failure of a single scan, by stage
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    InvalidFile(#[from] UploadRejection),

    #[error("{0} is not loaded")]
    ModelUnavailable(&'static str),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Card detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Text extraction failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("Text extraction timed out after {} seconds", .0.as_secs())]
    OcrTimeout(Duration),

    #[error("Field extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Processing task failed: {0}")]
    Task(#[from] JoinError),
}

/// Settings the pipeline reads on every request
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_content_length: usize,
    pub detection_threshold: f32,
    pub ocr_timeout: Duration,
    /// Used for automatic detection on blank OCR output
    pub default_language: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ScannerConfig::default())
    }
}

impl From<&ScannerConfig> for PipelineSettings {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            max_content_length: config.max_content_length,
            detection_threshold: config.detection_threshold(),
            ocr_timeout: config.ocr_timeout(),
            default_language: config.default_language.clone(),
        }
    }
}

/// Output of the decode, detect and preprocess stages
struct PreparedImage {
    info: ImageInfo,
    card_detected: bool,
    detection_confidence: f32,
    ocr_input: DynamicImage,
}

/// The scan pipeline with its collaborators, shared across requests
#[derive(Clone)]
pub struct ScanPipeline {
    models: VisionModelManager,
    language_detector: Arc<dyn LanguageDetector>,
    extractor: Arc<dyn InfoExtractor>,
    store: UploadStore,
    settings: PipelineSettings,
}

impl ScanPipeline {
    pub fn new(
        models: VisionModelManager,
        language_detector: Arc<dyn LanguageDetector>,
        extractor: Arc<dyn InfoExtractor>,
        store: UploadStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            models,
            language_detector,
            extractor,
            store,
            settings,
        }
    }

    pub fn models(&self) -> &VisionModelManager {
        &self.models
    }

    pub fn language_detector(&self) -> &dyn LanguageDetector {
        self.language_detector.as_ref()
    }

    pub fn extractor(&self) -> &dyn InfoExtractor {
        self.extractor.as_ref()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one scan
    ///
    /// `language` is the caller's preference; `None`, blank or `"auto"`
    /// (any case) requests automatic detection. Any other value is reported
    /// as `detected_language` with surrounding whitespace trimmed and is
    /// otherwise unchanged.
    pub async fn run(
        &self,
        upload: UploadedFile,
        language: Option<&str>,
    ) -> Result<ScanResponse, ScanError> {
        let started = Instant::now();

        validate_upload(&upload, self.settings.max_content_length)?;

        let detector = self
            .models
            .card_detector()
            .ok_or(ScanError::ModelUnavailable("Card detector"))?;
        let ocr = self
            .models
            .ocr_engine()
            .ok_or(ScanError::ModelUnavailable("OCR engine"))?;

        let scan_id = Uuid::new_v4();
        info!(
            %scan_id,
            filename = %upload.filename,
            content_type = upload.content_type.as_deref().unwrap_or("unknown"),
            size = upload.size(),
            "Processing image"
        );

        if let Err(e) = self
            .store
            .save(scan_id, &upload.filename, &upload.bytes)
            .await
        {
            warn!(%scan_id, "Failed to store upload for audit: {}", e);
        }

        let UploadedFile {
            filename, bytes, ..
        } = upload;

        let threshold = self.settings.detection_threshold;
        let prepared =
            tokio::task::spawn_blocking(move || prepare_image(&bytes, detector.as_ref(), threshold))
                .await??;

        debug!(
            %scan_id,
            width = prepared.info.width,
            height = prepared.info.height,
            card_detected = prepared.card_detected,
            detection_confidence = prepared.detection_confidence,
            "Image prepared for OCR"
        );

        let preference = language.map(str::trim).unwrap_or(AUTO_LANGUAGE);
        let auto = is_auto(preference);
        let hint = if auto { AUTO_LANGUAGE } else { preference };

        let raw_text = self
            .extract_text(ocr, prepared.ocr_input, hint.to_string())
            .await?;

        let detected_language = if !auto {
            preference.to_string()
        } else if raw_text.trim().is_empty() {
            self.settings.default_language.clone()
        } else {
            self.language_detector.detect(&raw_text)
        };

        let fields = self.extractor.extract(&raw_text, &detected_language)?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let response = ScanResponse::new(scan_id.to_string(), detected_language, raw_text, fields)
            .with_metadata("card_detected", prepared.card_detected)
            .with_metadata("image_width", prepared.info.width)
            .with_metadata("image_height", prepared.info.height)
            .with_metadata("original_filename", filename)
            .with_metadata("processing_time_ms", elapsed_ms);

        info!(
            %scan_id,
            language = %response.detected_language,
            elapsed_ms,
            "Successfully processed image"
        );

        Ok(response)
    }

    /// OCR on the blocking pool, bounded by the configured timeout
    ///
    /// A timed-out worker keeps running to completion in the background and
    /// keeps the OCR session locked. Until it finishes, later scans wait on
    /// that lock and time out too, so OCR throughput is zero while a stuck
    /// inference runs.
    async fn extract_text(
        &self,
        ocr: Arc<dyn OcrEngine>,
        image: DynamicImage,
        hint: String,
    ) -> Result<String, ScanError> {
        let timeout = self.settings.ocr_timeout;
        let task = tokio::task::spawn_blocking(move || ocr.extract_text(&image, &hint));

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => Ok(joined??),
            Err(_) => {
                warn!(
                    "OCR exceeded {:?}; the worker still holds the OCR session and \
                     later scans will queue behind it until it finishes",
                    timeout
                );
                Err(ScanError::OcrTimeout(timeout))
            }
        }
    }
}

/// Decode, locate the card and build the OCR input
fn prepare_image(
    bytes: &[u8],
    detector: &dyn CardDetector,
    threshold: f32,
) -> Result<PreparedImage, ScanError> {
    let (image, info) = load_image(bytes)?;
    let crop = locate_card(detector, image, threshold)?;
    let card_detected = crop.is_cropped();
    let ocr_input = preprocess_for_ocr(&crop.image);

    Ok(PreparedImage {
        info,
        card_detected,
        detection_confidence: crop.confidence,
        ocr_input,
    })
}

impl std::fmt::Debug for ScanPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanPipeline")
            .field("models", &self.models)
            .field("language_detector", &self.language_detector.name())
            .field("extractor", &self.extractor.name())
            .field("store", &self.store)
            .field("settings", &self.settings)
            .finish()
    }
}
