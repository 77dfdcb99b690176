// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for loading and running the damage detector

use image::RgbImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::vision::detector::{
    DamageDetectionModel, DamageDetector, DetectionError, DetectionRegion,
};
use crate::vision::draw::Annotator;
use crate::vision::image_utils::decode_image_bytes_with_limit;

/// Output of one detection run
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Input image with regions drawn on it
    pub annotated: RgbImage,
    pub regions: Vec<DetectionRegion>,
    pub processing_time_ms: u64,
    /// Name of the model that produced the regions
    pub model: String,
}

/// Manager for the damage detection model
///
/// The model path is fixed at construction. It is checked on every call to
/// [`run_detection`](Self::run_detection); the model itself is loaded on first
/// use and cached for later requests.
pub struct VisionModelManager {
    model_path: PathBuf,
    config: DetectionConfig,
    max_image_bytes: usize,
    detector: RwLock<Option<Arc<dyn DamageDetector>>>,
    annotator: Arc<Annotator>,
}

impl VisionModelManager {
    pub fn new(
        model_path: impl Into<PathBuf>,
        config: DetectionConfig,
        max_image_bytes: usize,
        annotator: Annotator,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            config,
            max_image_bytes,
            detector: RwLock::new(None),
            annotator: Arc::new(annotator),
        }
    }

    /// Manager with an already constructed detector (no lazy load)
    pub fn with_detector(
        model_path: impl Into<PathBuf>,
        detector: Arc<dyn DamageDetector>,
        max_image_bytes: usize,
        annotator: Annotator,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            config: DetectionConfig::default(),
            max_image_bytes,
            detector: RwLock::new(Some(detector)),
            annotator: Arc::new(annotator),
        }
    }

    /// Whether the model file is present on disk
    pub fn model_available(&self) -> bool {
        self.model_path.is_file()
    }

    /// Whether the model has been loaded into memory
    pub async fn is_loaded(&self) -> bool {
        self.detector.read().await.is_some()
    }

    /// Whether annotations carry `"<label> <conf>"` text (a label font is loaded)
    pub fn draws_label_text(&self) -> bool {
        self.annotator.has_font()
    }

    /// Get the cached detector, loading it on first use
    async fn detector(&self) -> Result<Arc<dyn DamageDetector>, DetectionError> {
        if let Some(detector) = self.detector.read().await.as_ref() {
            return Ok(detector.clone());
        }

        let mut slot = self.detector.write().await;
        // Another request may have loaded it while we waited
        if let Some(detector) = slot.as_ref() {
            return Ok(detector.clone());
        }

        let path = self.model_path.clone();
        let config = self.config.clone();
        let model = tokio::task::spawn_blocking(move || DamageDetectionModel::load(path, &config))
            .await
            .map_err(|e| {
                DetectionError::ModelLoad(format!("model loading task failed: {}", e))
            })??;

        let detector: Arc<dyn DamageDetector> = Arc::new(model);
        *slot = Some(detector.clone());
        Ok(detector)
    }

    /// Decode `image_bytes`, detect damage regions and draw them
    ///
    /// # Errors
    /// - `ModelNotFound` if the model file is missing, before anything else runs
    /// - `ModelLoad`, `Inference`, `UnexpectedOutput` for model failures
    /// - `Image` if the bytes cannot be decoded
    pub async fn run_detection(
        &self,
        image_bytes: Vec<u8>,
    ) -> Result<DetectionResult, DetectionError> {
        if !self.model_available() {
            return Err(DetectionError::ModelNotFound(self.model_path.clone()));
        }

        let detector = self.detector().await?;
        let annotator = self.annotator.clone();
        let max_bytes = self.max_image_bytes;

        tokio::task::spawn_blocking(move || -> Result<DetectionResult, DetectionError> {
            let start = Instant::now();

            let (image, info) = decode_image_bytes_with_limit(&image_bytes, max_bytes)?;
            debug!("Running damage detection on {}x{} image", info.width, info.height);

            let regions = detector.detect(&image)?;
            let annotated = annotator.plot(&image, &regions);
            let processing_time_ms = start.elapsed().as_millis() as u64;

            info!(
                "Damage detection found {} regions in {}ms",
                regions.len(),
                processing_time_ms
            );

            Ok(DetectionResult {
                annotated,
                regions,
                processing_time_ms,
                model: detector.model_name(),
            })
        })
        .await
        .map_err(|e| DetectionError::Inference(format!("detection task failed: {}", e)))?
    }
}
