// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text analysis over OCR output: language detection and field extraction

pub mod extraction;
pub mod language;

pub use extraction::{
    ExtractedFields, ExtractionError, InfoExtractor, RuleBasedExtractor, PRIMARY_FIELDS,
};
pub use language::{is_auto, HeuristicLanguageDetector, LanguageDetector, AUTO_LANGUAGE};
