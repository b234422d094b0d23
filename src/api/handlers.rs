// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, http::Uri, Json};
use serde::{Deserialize, Serialize};

use super::errors::ApiError;
use super::http_server::AppState;
use crate::version;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Unix time in seconds
    pub timestamp: f64,
}

impl HealthResponse {
    pub fn ok() -> Self {
        let timestamp = chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0;

        Self {
            status: "OK".to_string(),
            version: version::VERSION_NUMBER.to_string(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub model_type: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// GET /api/v1/health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// GET /api/v1/models - which collaborators loaded at startup
pub async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    let pipeline = &state.pipeline;

    let mut models: Vec<ModelInfo> = pipeline
        .models()
        .list_models()
        .into_iter()
        .map(|m| ModelInfo {
            name: m.name,
            model_type: m.model_type,
            available: m.available,
        })
        .collect();

    models.push(ModelInfo {
        name: pipeline.language_detector().name().to_string(),
        model_type: "language_detection".to_string(),
        available: true,
    });
    models.push(ModelInfo {
        name: pipeline.extractor().name().to_string(),
        model_type: "field_extraction".to_string(),
        available: true,
    });

    Json(ModelsResponse { models })
}

/// Fallback for unknown routes
pub async fn not_found_handler(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
