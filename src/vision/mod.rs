// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based damage detection
//!
//! This module provides:
//! - Image decoding and format detection
//! - YOLOv8 damage detection via ONNX Runtime
//! - Annotation of detected regions onto the input image
//!
//! Inference runs on CPU only.

pub mod detector;
pub mod draw;
pub mod image_utils;
pub mod model_manager;

pub use detector::{BoundingBox, DamageDetector, DetectionError, DetectionRegion};
pub use draw::Annotator;
pub use image_utils::{decode_image_bytes_with_limit, detect_format, ImageError, ImageInfo};
pub use model_manager::{DetectionResult, VisionModelManager};
