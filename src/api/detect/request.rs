// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;

/// Request to analyze a previously uploaded image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    /// Stored file name returned by /v1/upload
    #[serde(default)]
    pub file_name: String,
}

impl DetectRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.file_name.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "fileName".to_string(),
                message: "fileName is required".to_string(),
            });
        }
        Ok(())
    }
}
