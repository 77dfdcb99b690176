// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Damage detection model wrapper

use image::DynamicImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{DetectionError, Result};
use super::postprocess::{decode_output, parse_class_names, PostprocessParams};
use super::preprocessing::preprocess_for_detection;
use crate::config::DetectionConfig;

/// Class names used when neither the config nor the model metadata provide any
pub const DEFAULT_CLASS_NAMES: &[&str] = &["dent", "scratch", "broken-glass", "smash"];

/// Bounding box in original image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// A detected damage region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRegion {
    /// Class index in the model's output
    pub class_id: usize,
    /// Class label (e.g. "dent")
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Bounding box location
    pub bounding_box: BoundingBox,
}

/// Anything that can find damage regions in an image
#[cfg_attr(test, mockall::automock)]
pub trait DamageDetector: Send + Sync {
    /// Run the model on one image
    fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectionRegion>>;

    /// Short model identifier reported to clients
    fn model_name(&self) -> String;
}

/// YOLOv8 damage detector backed by ONNX Runtime
///
/// Runs on CPU. The session is guarded by a mutex, so one inference runs at a time.
pub struct DamageDetectionModel {
    session: Mutex<Session>,
    input_name: String,
    input_size: u32,
    class_names: Vec<String>,
    params: PostprocessParams,
    model_name: String,
}

impl std::fmt::Debug for DamageDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DamageDetectionModel")
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("class_names", &self.class_names)
            .field("params", &self.params)
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl DamageDetectionModel {
    /// Load the damage model from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn load<P: AsRef<Path>>(model_path: P, config: &DetectionConfig) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            return Err(DetectionError::ModelNotFound(model_path.to_path_buf()));
        }

        info!("Loading damage detection model from {}", model_path.display());

        let session = Session::builder()
            .and_then(|b| b.with_execution_providers([CPUExecutionProvider::default().build()]))
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(4))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                DetectionError::ModelLoad(format!("{}: {}", model_path.display(), e))
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let metadata_names = read_metadata(&session, "names").and_then(|n| parse_class_names(&n));
        let class_names = resolve_class_names(config.class_names.clone(), metadata_names);

        let input_size = match read_metadata(&session, "imgsz") {
            Some(imgsz) => parse_input_size(&imgsz).unwrap_or_else(|| {
                warn!(
                    "Model imgsz '{}' is not a square size; using {}px",
                    imgsz, config.input_size
                );
                config.input_size
            }),
            None => config.input_size,
        };

        let model_name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "damage-detector".to_string());

        debug!(
            "Damage model loaded - input: {} ({}px), classes: {:?}",
            input_name, input_size, class_names
        );

        info!("✅ Damage detection model loaded (CPU-only)");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            input_size,
            class_names,
            params: PostprocessParams {
                confidence_threshold: config.confidence_threshold,
                iou_threshold: config.iou_threshold,
                max_detections: config.max_detections,
            },
            model_name,
        })
    }
}

impl DamageDetector for DamageDetectionModel {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectionRegion>> {
        let (input, info) = preprocess_for_detection(image, self.input_size);

        let input_value = Value::from_array(input).map_err(|e| {
            DetectionError::Inference(format!("Failed to create input tensor: {}", e))
        })?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("model session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::UnexpectedOutput(e.to_string()))?;

        debug!("Detection output shape: {:?}", output_tensor.shape());

        let regions = decode_output(output_tensor.view(), &info, &self.params, &self.class_names)?;

        debug!("Detected {} damage regions", regions.len());
        Ok(regions)
    }

    fn model_name(&self) -> String {
        self.model_name.clone()
    }
}

fn read_metadata(session: &Session, key: &str) -> Option<String> {
    let metadata = session.metadata().ok()?;
    metadata.custom(key).ok().flatten()
}

/// Config override wins, then model metadata, then the built-in list
fn resolve_class_names(
    configured: Option<Vec<String>>,
    from_metadata: Option<Vec<String>>,
) -> Vec<String> {
    configured
        .filter(|names| !names.is_empty())
        .or(from_metadata)
        .unwrap_or_else(|| DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect())
}

/// Parse Ultralytics `imgsz` metadata such as `[640, 640]`
///
/// The letterbox input is square, so only a single size or equal sides are accepted.
fn parse_input_size(value: &str) -> Option<u32> {
    let sides: Vec<u32> = value
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>().ok())
        .collect::<Option<_>>()?;

    let (&first, rest) = sides.split_first()?;
    if first > 0 && rest.iter().all(|&side| side == first) {
        Some(first)
    } else {
        None
    }
}
