// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scan endpoint handler

use axum::extract::State;
use axum::Json;
use axum_extra::extract::multipart::MultipartRejection;
use axum_extra::extract::Multipart;
use tracing::{error, warn};

use super::request::parse_scan_form;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::pipeline::{ScanError, ScanResponse};

/// POST /api/v1/scan - Extract structured fields from an ID card image
///
/// # Request (multipart/form-data)
/// - `file`: JPEG or PNG image (required)
/// - `language`: language code, or `auto` (default) to detect it
///
/// # Errors
/// - 400 Bad Request: missing file, disallowed extension, file too large
/// - 500 Internal Server Error: decoding, detection, OCR or extraction failed
/// - 503 Service Unavailable: card detector or OCR model not loaded
pub async fn scan_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ScanResponse>, ApiError> {
    let multipart = multipart.map_err(|e| {
        warn!("Invalid file: {}", e);
        ApiError::InvalidFile(format!("Invalid multipart request: {}", e.body_text()))
    })?;

    let (file, language) = parse_scan_form(multipart)
        .await
        .and_then(|form| form.into_parts())
        .map_err(|e| {
            warn!("Invalid file: {}", e);
            e
        })?;

    match state.pipeline.run(file, language.as_deref()).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            match &e {
                ScanError::InvalidFile(_) => warn!("Invalid file: {}", e),
                ScanError::ModelUnavailable(_) => warn!("Model unavailable: {}", e),
                ScanError::Task(_) => error!("Unexpected error: {}", e),
                _ => error!("Processing error: {}", e),
            }
            Err(ApiError::from(e))
        }
    }
}
