// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod settings;

pub use settings::{ScannerConfig, ALLOWED_EXTENSIONS, DEFAULT_MAX_CONTENT_LENGTH};
