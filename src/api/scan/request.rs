// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart form parsing for scan requests

use axum_extra::extract::Multipart;
use tracing::debug;

use crate::api::errors::ApiError;
use crate::pipeline::{UploadRejection, UploadedFile};

/// Form field carrying the image
pub const FILE_FIELD: &str = "file";

/// Form field carrying the language preference
pub const LANGUAGE_FIELD: &str = "language";

/// Parsed scan form
#[derive(Debug, Clone, Default)]
pub struct ScanForm {
    pub file: Option<UploadedFile>,
    pub language: Option<String>,
}

impl ScanForm {
    /// The uploaded file, or `InvalidFile` when the part was missing
    pub fn into_parts(self) -> Result<(UploadedFile, Option<String>), ApiError> {
        let file = self
            .file
            .ok_or_else(|| ApiError::InvalidFile(UploadRejection::MissingFile.to_string()))?;
        Ok((file, self.language))
    }
}

/// Read every part of the form; unknown parts are skipped
///
/// Stream errors, including bodies over the transport limit, are
/// `InvalidFile`.
pub async fn parse_scan_form(mut multipart: Multipart) -> Result<ScanForm, ApiError> {
    let mut form = ScanForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidFile(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            FILE_FIELD => {
                if form.file.is_some() {
                    return Err(ApiError::InvalidFile(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }

                let filename = field.file_name().map(|s| s.to_string()).unwrap_or_default();
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    ApiError::InvalidFile(format!("Failed to read file data: {}", e))
                })?;

                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes: data.to_vec(),
                });
            }
            LANGUAGE_FIELD => {
                let value = field.text().await.map_err(|e| {
                    ApiError::InvalidFile(format!("Failed to read language field: {}", e))
                })?;
                form.language = Some(value);
            }
            other => {
                debug!("Ignoring multipart field '{}'", other);
            }
        }
    }

    Ok(form)
}
