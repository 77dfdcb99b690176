// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "damage-detector.toml";

/// Automated Vehicle Damage Detector
#[derive(Parser, Debug, Default)]
#[command(name = "damage-detector")]
#[command(version)]
#[command(about = "Upload a vehicle photo and detect visible damage", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, env = "DAMAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(long)]
    pub listen: Option<String>,

    /// Path to the ONNX damage model (overrides config)
    #[arg(long)]
    pub model: Option<PathBuf>,
}

impl Cli {
    /// Resolve the effective configuration: defaults, file, environment, flags
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                AppConfig::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => AppConfig::default(),
        };

        config.apply_env();

        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
