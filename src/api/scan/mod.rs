// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ID card scan endpoint
//!
//! `POST /api/v1/scan` with a multipart form carrying a `file` part and an
//! optional `language` part.

pub mod handler;
pub mod request;

pub use crate::pipeline::ScanResponse;
pub use handler::scan_handler;
pub use request::{parse_scan_form, ScanForm};
