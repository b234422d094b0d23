// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Uploaded scan payloads and the file validator

use crate::config::ALLOWED_EXTENSIONS;

/// An image received from a client, held fully in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Filename as sent by the client, unsanitized
    pub filename: String,
    /// Declared by the client; logged only, never trusted for decoding
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes,
        }
    }

    /// Lowercased text after the last `.`, if any
    pub fn extension(&self) -> Option<String> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Reasons an upload is rejected before processing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("No file part in the request")]
    MissingFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("File type not allowed. Allowed types: {}", ALLOWED_EXTENSIONS.join(", "))]
    DisallowedExtension,

    #[error("File too large. Maximum size is {max} bytes")]
    TooLarge { max: usize },
}

/// Check filename and size; content is not inspected
pub fn validate_upload(file: &UploadedFile, max_content_length: usize) -> Result<(), UploadRejection> {
    if file.filename.trim().is_empty() {
        return Err(UploadRejection::EmptyFilename);
    }

    match file.extension() {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => return Err(UploadRejection::DisallowedExtension),
    }

    if file.size() > max_content_length {
        return Err(UploadRejection::TooLarge {
            max: max_content_length,
        });
    }

    Ok(())
}
