// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Environment-driven service settings
//!
//! Every option can be given as a CLI flag or through the environment
//! (a `.env` file is loaded first by `main`).

use anyhow::{bail, Result};
use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default maximum upload size (16 MiB)
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

/// Extensions accepted by the file validator (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

fn random_secret_key() -> String {
    hex::encode(rand::random::<[u8; 24]>())
}

/// ID Card Scanner service configuration
#[derive(Parser, Clone)]
#[command(name = "id-card-scanner")]
#[command(version)]
#[command(about = "Scan identity documents and extract structured fields", long_about = None)]
pub struct ScannerConfig {
    /// Secret key for the deployment (never logged)
    #[arg(long, env = "SECRET_KEY", default_value_t = random_secret_key(), hide_default_value = true)]
    pub secret_key: String,

    /// Enable debug logging
    #[arg(
        long,
        env = "DEBUG",
        default_value_t = false,
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub debug: bool,

    /// Address to bind the HTTP server to
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "API_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Directory receiving the audit copy of every upload
    #[arg(long, env = "UPLOAD_FOLDER", default_value = "data/uploads")]
    pub upload_folder: PathBuf,

    /// Maximum accepted upload size in bytes
    #[arg(long, env = "MAX_CONTENT_LENGTH", default_value_t = DEFAULT_MAX_CONTENT_LENGTH)]
    pub max_content_length: usize,

    /// Base directory for model files
    #[arg(long, env = "MODELS_FOLDER", default_value = "data/models")]
    pub models_folder: PathBuf,

    /// ONNX card detector model
    #[arg(long, env = "ID_DETECTOR_MODEL", default_value = "data/models/id_detector.onnx")]
    pub id_detector_model: PathBuf,

    /// PaddleOCR model directory (det_model.onnx, rec_model.onnx, ppocr_keys_v1.txt)
    #[arg(long, env = "OCR_MODEL_DIR", default_value = "data/models/paddleocr-onnx")]
    pub ocr_model_dir: PathBuf,

    /// English extractor rules directory
    #[arg(long, env = "NER_EN_MODEL", default_value = "data/models/ner_en")]
    pub ner_en_model: PathBuf,

    /// Vietnamese extractor rules directory
    #[arg(long, env = "NER_VI_MODEL", default_value = "data/models/ner_vi")]
    pub ner_vi_model: PathBuf,

    /// OCR timeout in seconds
    #[arg(long, env = "OCR_TIMEOUT", default_value_t = 30)]
    pub ocr_timeout: u64,

    /// Minimum card detector confidence required to crop
    #[arg(long, env = "DETECTION_CONFIDENCE_THRESHOLD", default_value_t = 0.7)]
    pub detection_confidence_threshold: f32,

    /// Language returned when automatic detection cannot decide
    #[arg(long, env = "DEFAULT_LANGUAGE", default_value = "en")]
    pub default_language: String,

    /// Directory for the rotating log file
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}

impl fmt::Debug for ScannerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerConfig")
            .field("secret_key", &"<redacted>")
            .field("debug", &self.debug)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("upload_folder", &self.upload_folder)
            .field("max_content_length", &self.max_content_length)
            .field("models_folder", &self.models_folder)
            .field("id_detector_model", &self.id_detector_model)
            .field("ocr_model_dir", &self.ocr_model_dir)
            .field("ner_en_model", &self.ner_en_model)
            .field("ner_vi_model", &self.ner_vi_model)
            .field("ocr_timeout", &self.ocr_timeout)
            .field(
                "detection_confidence_threshold",
                &self.detection_confidence_threshold,
            )
            .field("default_language", &self.default_language)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            secret_key: random_secret_key(),
            debug: false,
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_folder: PathBuf::from("data/uploads"),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            models_folder: PathBuf::from("data/models"),
            id_detector_model: PathBuf::from("data/models/id_detector.onnx"),
            ocr_model_dir: PathBuf::from("data/models/paddleocr-onnx"),
            ner_en_model: PathBuf::from("data/models/ner_en"),
            ner_vi_model: PathBuf::from("data/models/ner_vi"),
            ocr_timeout: 30,
            detection_confidence_threshold: 0.7,
            default_language: "en".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl ScannerConfig {
    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_content_length == 0 {
            bail!("MAX_CONTENT_LENGTH must be greater than 0");
        }
        if self.ocr_timeout == 0 {
            bail!("OCR_TIMEOUT must be at least 1 second");
        }
        if !self.detection_confidence_threshold.is_finite() {
            bail!(
                "DETECTION_CONFIDENCE_THRESHOLD must be a finite number, got {}",
                self.detection_confidence_threshold
            );
        }
        if self.default_language.trim().is_empty()
            || self.default_language.eq_ignore_ascii_case("auto")
        {
            bail!("DEFAULT_LANGUAGE must be a concrete language code");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse::<SocketAddr>()?)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout)
    }

    /// Threshold clamped to [0, 1]
    pub fn detection_threshold(&self) -> f32 {
        self.detection_confidence_threshold.clamp(0.0, 1.0)
    }
}
