// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload endpoint handler

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::Multipart;
use tracing::{debug, info, warn};

use super::response::UploadResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::storage::ImageStore;
use crate::vision::image_utils::{decode_image_bytes_with_limit, ImageError};

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// POST /v1/upload - Store a vehicle photo
///
/// # Request
/// `multipart/form-data` with a `file` field holding a JPG or PNG image.
///
/// # Response
/// - `id`: Generated unique identifier
/// - `fileName`: Stored name, used by /v1/detect
/// - `imageUrl`: Where the stored image is served
/// - `width`, `height`, `sizeBytes`: Image metadata
///
/// # Errors
/// - 400 Bad Request: Missing field, unsupported extension, empty or undecodable image
/// - 413 Payload Too Large: Image exceeds the configured upload limit
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let max_bytes = state.config.max_upload_bytes;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { max_bytes }
        } else {
            ApiError::InvalidRequest(format!("Malformed multipart body: {}", e.body_text()))
        }
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::ValidationError {
                field: FILE_FIELD.to_string(),
                message: "file name is required".to_string(),
            })?;

        // Reject by extension before reading the body
        ImageStore::upload_extension(&original_name)?;

        let bytes = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge { max_bytes }
            } else {
                ApiError::InvalidRequest(format!("Failed to read upload: {}", e.body_text()))
            }
        })?;

        debug!("Upload received: {} ({} bytes)", original_name, bytes.len());

        let (_, info) = decode_image_bytes_with_limit(&bytes, max_bytes).map_err(|e| {
            warn!("Rejected upload {}: {}", original_name, e);
            match e {
                ImageError::TooLarge(_, max) => ApiError::PayloadTooLarge { max_bytes: max },
                other => ApiError::ValidationError {
                    field: FILE_FIELD.to_string(),
                    message: format!("Invalid image: {}", other),
                },
            }
        })?;

        let stored = state.store.save_upload(&bytes, &original_name).await?;

        info!(
            "Stored upload {} ({}x{}, {} bytes)",
            stored.file_name, info.width, info.height, stored.size_bytes
        );

        return Ok(Json(UploadResponse::new(stored, &info)));
    }

    Err(ApiError::ValidationError {
        field: FILE_FIELD.to_string(),
        message: "multipart field 'file' is required".to_string(),
    })
}

