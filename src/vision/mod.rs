// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image handling for document scans
//!
//! This module provides:
//! - Upload decoding (`image_utils`)
//! - Card localisation and cropping (`card_detection`)
//! - OCR preprocessing and text extraction (`preprocessing`, `ocr`)
//!
//! All models run on CPU through ONNX Runtime.

pub mod card_detection;
pub mod image_utils;
pub mod model_manager;
pub mod ocr;
pub mod preprocessing;

pub use card_detection::{
    locate_card, CardCrop, CardDetection, CardDetector, CropRegion, DetectionError,
    OnnxCardDetector,
};
pub use image_utils::{detect_format, load_image, ImageError, ImageInfo};
pub use model_manager::{VisionModelConfig, VisionModelInfo, VisionModelManager};
pub use ocr::{OcrEngine, OcrError, PaddleOcrEngine};
pub use preprocessing::{preprocess_for_card_detection, preprocess_for_ocr};
