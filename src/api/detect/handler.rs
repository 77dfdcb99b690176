// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{debug, info, warn};

use super::request::DetectRequest;
use super::response::DetectResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::DetectionError;

/// POST /v1/detect - Find vehicle damage in an uploaded image
///
/// Runs the damage model on a stored upload, saves the annotated image as
/// `result_<fileName>` and reports the detected regions.
///
/// # Request
/// - `fileName`: Stored name returned by /v1/upload (required)
///
/// # Response
/// - `resultUrl`: Annotated image
/// - `count`, `status`, `message`: Outcome shown to the user
/// - `regions`: Detected regions with labels, confidences and boxes
/// - `processingTimeMs`, `model`
///
/// # Errors
/// - 400 Bad Request: Body is not a JSON object with a string `fileName`,
///   or the file name is missing or invalid
/// - 404 Not Found: Unknown upload
/// - 503 Service Unavailable: Model file missing
/// - 500 Internal Server Error: Model load or inference failed
pub async fn detect_handler(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    request.validate()?;
    debug!("Detection requested for {}", request.file_name);

    let image_bytes = state.store.read_upload(&request.file_name).await?;

    let result = state
        .vision
        .run_detection(image_bytes)
        .await
        .map_err(|e| match e {
            DetectionError::ModelNotFound(path) => {
                warn!("Damage model missing at {}", path.display());
                ApiError::ModelNotFound {
                    path: path.display().to_string(),
                    file_name: state.config.model_file_name(),
                }
            }
            other => {
                warn!("Damage detection failed for {}: {}", request.file_name, other);
                ApiError::DetectionFailed(other.to_string())
            }
        })?;

    let stored = state
        .store
        .save_result(&request.file_name, &result.annotated)
        .await?;

    info!(
        "Detection complete for {}: {} regions, {}ms",
        request.file_name,
        result.regions.len(),
        result.processing_time_ms
    );

    Ok(Json(DetectResponse::new(
        request.file_name,
        stored.file_name,
        result.regions,
        result.processing_time_ms,
        result.model,
    )))
}
