// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text extraction on ONNX Runtime (CPU only)
//!
//! Components:
//! - `detection` - Text region detection
//! - `recognition` - Line recognition with CTC decoding
//! - `preprocessing` - Model input tensors
//! - `engine` - `OcrEngine` trait and the combined PaddleOCR pipeline

pub mod detection;
pub mod engine;
pub mod preprocessing;
pub mod recognition;

pub use detection::{OcrDetectionModel, TextBox};
pub use engine::{assemble_lines, OcrEngine, OcrError, PaddleOcrEngine, TextRegion};
pub use recognition::{OcrRecognitionModel, RecognizedText};
