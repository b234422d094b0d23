// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Logging setup: stdout plus a size-rotated log file

use anyhow::{Context, Result};
use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "id_scanner.log";

/// Rotate once the active file reaches 10 MiB
const MAX_LOG_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Rotated files kept next to the active one
const MAX_LOG_BACKUPS: usize = 10;

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// `RUST_LOG` wins; otherwise `debug` or `info` depending on `debug`
pub fn build_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }))
}

/// Install the global subscriber
///
/// Fails if `log_dir` cannot be created or a subscriber is already set.
pub fn init_logging(log_dir: &Path, debug: bool) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let log_file = FileRotate::new(
        log_file_path(log_dir),
        AppendCount::new(MAX_LOG_BACKUPS),
        ContentLimit::Bytes(MAX_LOG_FILE_BYTES),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    tracing_subscriber::registry()
        .with(build_filter(debug))
        .with(fmt::layer())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Mutex::new(log_file)),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
