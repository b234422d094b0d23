// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Audit storage for uploaded scans

pub mod uploads;

pub use uploads::{sanitize_filename, StorageError, StoredUpload, UploadStore};
