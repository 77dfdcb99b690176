// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use super::detect::detect_handler;
use super::handlers::{health_handler, index_handler};
use super::upload::upload_handler;
use crate::config::AppConfig;
use crate::storage::ImageStore;
use crate::vision::VisionModelManager;

/// Room for multipart boundaries and headers on top of the image itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: ImageStore,
    pub vision: Arc<VisionModelManager>,
}

impl AppState {
    pub fn new(config: AppConfig, store: ImageStore, vision: VisionModelManager) -> Self {
        Self {
            config: Arc::new(config),
            store,
            vision: Arc::new(vision),
        }
    }
}

/// Build the router with all routes and layers
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    let uploads = ServeDir::new(state.store.upload_dir());
    let results = ServeDir::new(state.store.result_dir());

    Router::new()
        // Single page UI
        .route("/", get(index_handler))
        // Health check
        .route("/health", get(health_handler))
        // Upload endpoint
        .route("/v1/upload", post(upload_handler))
        // Detection endpoint
        .route("/v1/detect", post(detect_handler))
        // Stored images
        .nest_service("/uploads", uploads)
        .nest_service("/results", results)
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

/// Bind the configured address and serve until Ctrl+C
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = state
        .config
        .listen_addr
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid listen address '{}'", state.config.listen_addr))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🌐 HTTP server listening on http://{}", addr);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("🛑 Shutdown signal received");
    }
}
