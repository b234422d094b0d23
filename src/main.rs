// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use id_card_scanner::{
    api::{start_server, AppState},
    config::ScannerConfig,
    monitoring::init_logging,
    pipeline::{PipelineSettings, ScanPipeline},
    storage::UploadStore,
    text::{HeuristicLanguageDetector, RuleBasedExtractor},
    version,
    vision::{VisionModelConfig, VisionModelManager},
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenv::dotenv().ok();

    let config = ScannerConfig::parse();
    config.validate()?;

    init_logging(&config.log_dir, config.debug)?;

    info!("Starting {}", version::get_version_string());
    info!("Configuration: {:?}", config);

    let store = UploadStore::new(&config.upload_folder);
    store
        .ensure_folder()
        .await
        .context("Failed to prepare upload folder")?;
    info!("Audit copies of uploads go to {}", store.folder().display());

    let models = VisionModelManager::new(VisionModelConfig::from(&config)).await?;
    if !models.has_card_detector() || !models.has_ocr() {
        warn!("Not all vision models loaded; scans will return 503 until they are available");
    }

    let extractor = RuleBasedExtractor::load(&config.ner_en_model, &config.ner_vi_model)
        .context("Failed to build field extractor")?;
    let language_detector = HeuristicLanguageDetector::new(config.default_language.clone());

    let pipeline = ScanPipeline::new(
        models,
        Arc::new(language_detector),
        Arc::new(extractor),
        store,
        PipelineSettings::from(&config),
    );

    let addr = config.listen_addr()?;
    info!("Endpoints:");
    info!("  Health: GET  http://{}{}/health", addr, version::API_V1_PREFIX);
    info!("  Models: GET  http://{}{}/models", addr, version::API_V1_PREFIX);
    info!("  Scan:   POST http://{}{}/scan", addr, version::API_V1_PREFIX);

    start_server(addr, AppState::new(pipeline)).await?;

    info!("Goodbye");
    Ok(())
}
