// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Damage Detector service

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-yolov8-onnx-2026-10-17";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2026-10-17";

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Damage Detector {} ({})", VERSION_NUMBER, BUILD_DATE)
}
