// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload response types

use serde::{Deserialize, Serialize};

use crate::storage::StoredImage;
use crate::vision::ImageInfo;

/// Response for a stored upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Generated unique identifier
    pub id: String,
    /// Stored file name (`<id><ext>`), passed back to /v1/detect
    pub file_name: String,
    /// URL the uploaded image is served from
    pub image_url: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
}

impl UploadResponse {
    pub fn new(stored: StoredImage, info: &ImageInfo) -> Self {
        Self {
            image_url: format!("/uploads/{}", stored.file_name),
            id: stored.id,
            file_name: stored.file_name,
            width: info.width,
            height: info.height,
            size_bytes: stored.size_bytes,
        }
    }
}
