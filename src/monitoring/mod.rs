// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service observability

pub mod logging;

pub use logging::{init_logging, LOG_FILE_NAME};
