// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use damage_detector::{
    api::{start_server, AppState},
    cli::Cli,
    storage::ImageStore,
    version,
    vision::{Annotator, VisionModelManager},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins; default to info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    println!("🚀 Starting Damage Detector...\n");
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!("📅 Build Date: {}", version::BUILD_DATE);
    println!();

    info!("{}", version::get_version_string());

    let config = cli.load_config()?;
    info!("Configuration: {:?}", config);

    // Create folders if they don't exist
    let store = ImageStore::open(&config.upload_dir, &config.result_dir).await?;
    println!("📁 Uploads: {}", store.upload_dir().display());
    println!("📁 Results: {}", store.result_dir().display());

    let annotator = match &config.font_path {
        Some(path) => match Annotator::with_font_file(path) {
            Ok(annotator) => annotator,
            Err(e) => {
                warn!("⚠️ {}; labels will be drawn without text", e);
                Annotator::new()
            }
        },
        None => {
            info!("No label font configured; labels will be drawn without text");
            Annotator::new()
        }
    };

    let vision = VisionModelManager::new(
        config.model_path.clone(),
        config.detection.clone(),
        config.max_upload_bytes,
        annotator,
    );

    if vision.model_available() {
        println!("✅ Model file found: {}", config.model_path.display());
    } else {
        println!("⚠️  Model file not found at: {}", config.model_path.display());
        println!(
            "   Detection requests will fail until '{}' is present",
            config.model_file_name()
        );
    }

    let state = AppState::new(config, store, vision);
    start_server(state).await?;

    println!("👋 Damage Detector stopped");
    Ok(())
}
