// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::storage::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    PayloadTooLarge {
        max_bytes: usize,
    },
    /// Model file absent from the configured path
    ModelNotFound {
        path: String,
        file_name: String,
    },
    /// Model load or inference failed; the text is shown to the user as is
    DetectionFailed(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, details) = match self {
            ApiError::NotFound(_) => ("not_found", None),
            ApiError::InvalidRequest(_) => ("invalid_request", None),
            ApiError::ValidationError { field, .. } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", Some(details))
            }
            ApiError::PayloadTooLarge { max_bytes } => {
                let mut details = HashMap::new();
                details.insert(
                    "max_bytes".to_string(),
                    serde_json::Value::Number((*max_bytes as u64).into()),
                );
                ("payload_too_large", Some(details))
            }
            ApiError::ModelNotFound { path, .. } => {
                let mut details = HashMap::new();
                details.insert(
                    "path".to_string(),
                    serde_json::Value::String(path.clone()),
                );
                ("model_not_found", Some(details))
            }
            ApiError::DetectionFailed(_) => ("detection_failed", None),
            ApiError::InternalError(_) => ("internal_error", None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message: self.user_message(),
            details,
        }
    }

    /// Message shown in the UI
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::InvalidRequest(msg) => msg.clone(),
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::PayloadTooLarge { max_bytes } => {
                format!("Upload exceeds the maximum size of {} bytes", max_bytes)
            }
            ApiError::ModelNotFound { path, file_name } => format!(
                "Model file not found at: {}. Please ensure '{}' is in the project directory.",
                path, file_name
            ),
            ApiError::DetectionFailed(msg) => format!("Error during detection: {}", msg),
            ApiError::InternalError(msg) => msg.clone(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::PayloadTooLarge { .. } => 413,
            ApiError::ModelNotFound { .. } => 503,
            ApiError::DetectionFailed(_) | ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            other => write!(f, "{}", other.user_message()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedExtension(_) => ApiError::ValidationError {
                field: "file".to_string(),
                message: err.to_string(),
            },
            StorageError::InvalidName(_) => ApiError::ValidationError {
                field: "fileName".to_string(),
                message: err.to_string(),
            },
            StorageError::NotFound(_) => ApiError::NotFound(err.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}
