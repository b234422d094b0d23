// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the ID Card Scanner service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Service name used in logs and the startup banner
pub const SERVICE_NAME: &str = "ID Card Scanner Service";

/// API prefix shared by every route
pub const API_V1_PREFIX: &str = "/api/v1";

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("{} {}", SERVICE_NAME, VERSION_NUMBER)
}
