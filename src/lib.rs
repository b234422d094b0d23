// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod monitoring;
pub mod pipeline;
pub mod storage;
pub mod text;
pub mod version;
pub mod vision;

pub use api::{create_router, ApiError, AppState};
pub use config::ScannerConfig;
pub use pipeline::{ScanError, ScanPipeline, ScanResponse, UploadedFile};
