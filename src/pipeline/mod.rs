// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request pipeline turning an uploaded image into a `ScanResponse`

pub mod result;
pub mod scan;
pub mod upload;

pub use result::ScanResponse;
pub use scan::{PipelineSettings, ScanError, ScanPipeline};
pub use upload::{validate_upload, UploadRejection, UploadedFile};
