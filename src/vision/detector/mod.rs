// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 vehicle damage detection
//!
//! This module provides CPU-based damage detection using an ONNX export of
//! a YOLOv8 model trained on dents, scratches, broken glass and smashes.
//!
//! Components:
//! - `preprocessing` - Letterbox and tensor conversion
//! - `postprocess` - Output decoding and NMS
//! - `model` - ONNX Runtime session wrapper

pub mod error;
pub mod model;
pub mod postprocess;
pub mod preprocessing;

pub use error::DetectionError;
pub use model::{BoundingBox, DamageDetectionModel, DamageDetector, DetectionRegion};
pub use postprocess::PostprocessParams;
pub use preprocessing::{preprocess_for_detection, LetterboxInfo};
