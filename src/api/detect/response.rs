// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::render::{DetectionOutcome, OutcomeStatus};
use crate::vision::DetectionRegion;

/// Response for a detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    /// Upload that was analyzed
    pub file_name: String,
    /// Stored annotated image (`result_<fileName>`)
    pub result_file_name: String,
    /// URL the annotated image is served from
    pub result_url: String,
    /// Number of detected regions
    pub count: usize,
    /// "success" when damage was found, "info" otherwise
    pub status: OutcomeStatus,
    /// Message shown under the result image
    pub message: String,
    pub regions: Vec<DetectionRegion>,
    pub processing_time_ms: u64,
    /// Model used
    pub model: String,
}

impl DetectResponse {
    pub fn new(
        file_name: String,
        result_file_name: String,
        regions: Vec<DetectionRegion>,
        processing_time_ms: u64,
        model: String,
    ) -> Self {
        let outcome = DetectionOutcome::from_regions(&regions);
        Self {
            file_name,
            result_url: format!("/results/{}", result_file_name),
            result_file_name,
            count: outcome.count,
            status: outcome.status,
            message: outcome.message,
            regions,
            processing_time_ms,
            model,
        }
    }
}
