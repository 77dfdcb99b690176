// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod render;
pub mod storage;
pub mod version;
pub mod vision;

pub use api::{create_app, AppState};
pub use config::{AppConfig, DetectionConfig};
pub use render::{DetectionOutcome, OutcomeStatus};
pub use storage::ImageStore;
pub use vision::{DamageDetector, DetectionRegion, VisionModelManager};
