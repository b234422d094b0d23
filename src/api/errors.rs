// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pipeline::ScanError;

/// Message returned for failures with no client-safe detail
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    InvalidFile(String),
    Processing(String),
    ModelUnavailable(String),
    NotFound(String),
    Unexpected,
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let error = match self {
            ApiError::InvalidFile(msg)
            | ApiError::Processing(msg)
            | ApiError::ModelUnavailable(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::Unexpected => UNEXPECTED_ERROR_MESSAGE.to_string(),
        };

        ErrorResponse {
            error,
            status_code: self.status_code(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidFile(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Processing(_) | ApiError::Unexpected => 500,
            ApiError::ModelUnavailable(_) => 503,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidFile(msg) => write!(f, "Invalid file: {}", msg),
            ApiError::Processing(msg) => write!(f, "Processing error: {}", msg),
            ApiError::ModelUnavailable(msg) => write!(f, "Model unavailable: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Unexpected => write!(f, "{}", UNEXPECTED_ERROR_MESSAGE),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::InvalidFile(rejection) => ApiError::InvalidFile(rejection.to_string()),
            ScanError::ModelUnavailable(model) => {
                ApiError::ModelUnavailable(format!("Required models could not be loaded: {}", model))
            }
            ScanError::Task(_) => ApiError::Unexpected,
            other => ApiError::Processing(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
