// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Write-once audit copies of uploads
//!
//! Each upload is stored as `<scan_id>_<sanitized filename>` under the
//! upload folder. Files are never read back by the service.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Stored names are cut to this many characters after sanitizing
const MAX_FILENAME_LENGTH: usize = 200;

/// Used when nothing of the original name survives sanitizing
const FALLBACK_FILENAME: &str = "upload";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create upload folder {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write upload {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reduce a client-supplied filename to a safe single path component
///
/// Directory parts are dropped, whitespace becomes `_`, anything outside
/// ASCII alphanumerics and `._-` is removed, and leading or trailing dots
/// and underscores are stripped.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let sanitized: String = base
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    let sanitized = sanitized.replace("..", "");
    let trimmed = sanitized.trim_matches(|c| c == '.' || c == '_');
    let truncated: String = trimmed.chars().take(MAX_FILENAME_LENGTH).collect();

    if truncated.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        truncated
    }
}

/// An upload persisted for auditing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub scan_id: Uuid,
    pub path: PathBuf,
    pub size_bytes: usize,
}

/// Writes audit copies into a single folder
#[derive(Debug, Clone)]
pub struct UploadStore {
    folder: PathBuf,
}

impl UploadStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Create the upload folder if it does not exist
    pub async fn ensure_folder(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.folder)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: self.folder.clone(),
                source,
            })
    }

    pub fn path_for(&self, scan_id: Uuid, original_filename: &str) -> PathBuf {
        self.folder
            .join(format!("{}_{}", scan_id, sanitize_filename(original_filename)))
    }

    /// Write `bytes` for `scan_id`
    ///
    /// The folder is created on demand so a folder removed at runtime does
    /// not break auditing.
    pub async fn save(
        &self,
        scan_id: Uuid,
        original_filename: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload, StorageError> {
        self.ensure_folder().await?;

        let path = self.path_for(scan_id, original_filename);
        fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        debug!("Stored upload {} ({} bytes)", path.display(), bytes.len());

        Ok(StoredUpload {
            scan_id,
            path,
            size_bytes: bytes.len(),
        })
    }
}
