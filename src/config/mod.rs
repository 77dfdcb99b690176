// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Layering, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. Optional TOML file (every key optional)
//! 3. `DAMAGE_*` environment variables
//! 4. Command line flags (see `crate::cli`)

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// File name of the pretrained damage model expected next to the service
pub const DEFAULT_MODEL_FILE: &str = "damage-detector.onnx";

/// Default maximum upload size (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Model inference parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Square model input size in pixels
    pub input_size: u32,
    /// Minimum class confidence for a region to be reported
    pub confidence_threshold: f32,
    /// IoU above which overlapping boxes of one class are suppressed
    pub iou_threshold: f32,
    /// Upper bound on regions reported per image
    pub max_detections: usize,
    /// Overrides the class names embedded in the model metadata
    pub class_names: Option<Vec<String>>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
            class_names: None,
        }
    }
}

/// Top level service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Path to the pretrained ONNX model
    pub model_path: PathBuf,
    /// Directory receiving uploaded images
    pub upload_dir: PathBuf,
    /// Directory receiving annotated result images
    pub result_dir: PathBuf,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
    /// TrueType font used for box labels; labels are drawn without text when unset
    pub font_path: Option<PathBuf>,
    pub detection: DetectionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8501".to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_FILE),
            upload_dir: PathBuf::from("uploads"),
            result_dir: PathBuf::from("results"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            font_path: None,
            detection: DetectionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; absent keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `DAMAGE_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("DAMAGE_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(path) = lookup("DAMAGE_MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("DAMAGE_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DAMAGE_RESULT_DIR") {
            self.result_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("DAMAGE_FONT_PATH") {
            self.font_path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("DAMAGE_CONF_THRESHOLD") {
            match value.parse() {
                Ok(v) => self.detection.confidence_threshold = v,
                Err(_) => warn!("Ignoring DAMAGE_CONF_THRESHOLD={}: not a number", value),
            }
        }
        if let Some(value) = lookup("DAMAGE_IOU_THRESHOLD") {
            match value.parse() {
                Ok(v) => self.detection.iou_threshold = v,
                Err(_) => warn!("Ignoring DAMAGE_IOU_THRESHOLD={}: not a number", value),
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detection;
        if !(0.0..=1.0).contains(&d.confidence_threshold) {
            return Err(ConfigError::Invalid {
                field: "detection.confidence_threshold".to_string(),
                message: format!("{} is outside [0, 1]", d.confidence_threshold),
            });
        }
        if !(0.0..=1.0).contains(&d.iou_threshold) {
            return Err(ConfigError::Invalid {
                field: "detection.iou_threshold".to_string(),
                message: format!("{} is outside [0, 1]", d.iou_threshold),
            });
        }
        if d.input_size == 0 || d.input_size % 32 != 0 {
            return Err(ConfigError::Invalid {
                field: "detection.input_size".to_string(),
                message: format!("{} must be a positive multiple of 32", d.input_size),
            });
        }
        if d.max_detections == 0 {
            return Err(ConfigError::Invalid {
                field: "detection.max_detections".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_upload_bytes".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// File name of the configured model, used in user facing messages
    pub fn model_file_name(&self) -> String {
        self.model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_MODEL_FILE.to_string())
    }
}
