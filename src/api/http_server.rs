// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, models_handler, not_found_handler};
use super::scan::scan_handler;
use crate::pipeline::ScanPipeline;
use crate::version::API_V1_PREFIX;

/// Room for multipart boundaries and the `language` part on top of the
/// file itself, so oversize files reach the validator with a clear message
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ScanPipeline>,
}

impl AppState {
    pub fn new(pipeline: ScanPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state
        .pipeline
        .settings()
        .max_content_length
        .saturating_add(MULTIPART_OVERHEAD);

    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/models", get(models_handler))
        .route("/scan", post(scan_handler));

    Router::new()
        .nest(API_V1_PREFIX, api)
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
