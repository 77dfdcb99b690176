// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User facing outcome of a detection run

use serde::{Deserialize, Serialize};

use crate::vision::DetectionRegion;

/// Message shown when the model finds nothing
pub const NO_DAMAGE_MESSAGE: &str = "No visible damage detected.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// At least one region was found
    Success,
    /// Nothing was found
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionOutcome {
    pub status: OutcomeStatus,
    pub count: usize,
    pub message: String,
}

impl DetectionOutcome {
    pub fn from_regions(regions: &[DetectionRegion]) -> Self {
        Self::from_count(regions.len())
    }

    pub fn from_count(count: usize) -> Self {
        if count == 0 {
            Self {
                status: OutcomeStatus::Info,
                count,
                message: NO_DAMAGE_MESSAGE.to_string(),
            }
        } else {
            Self {
                status: OutcomeStatus::Success,
                count,
                message: format!("Detected {} issue(s)!", count),
            }
        }
    }
}
