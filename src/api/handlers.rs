// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, response::Html, Json};
use serde::{Deserialize, Serialize};

use crate::api::http_server::AppState;
use crate::version;

/// The single page UI
pub const INDEX_HTML: &str = include_str!("../../assets/index.html");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Whether the model file is present at the configured path
    pub model_available: bool,
    /// Whether the model has been loaded into memory
    pub model_loaded: bool,
    /// Whether annotation labels include text (a font was loaded)
    pub label_text: bool,
    pub version: String,
}

/// GET / - Serve the upload and results page
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_available: state.vision.model_available(),
        model_loaded: state.vision.is_loaded().await,
        label_text: state.vision.draws_label_text(),
        version: version::VERSION_NUMBER.to_string(),
    })
}
