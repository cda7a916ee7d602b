//! Engine and pipeline wiring

use crate::state::AppState;
use anyhow::{Context, Result};
use docup_core::Config;
use docup_processing::UploadService;
use docup_services::{ClamAVService, OcrTextExtractor};
use docup_storage::{LocalStorage, Storage};
use std::sync::Arc;

/// Build the storage writer, the engine adapters and the upload service.
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let storage = LocalStorage::new(&config.upload.storage_path)
        .await
        .context("Failed to initialize local storage")?;
    tracing::info!(root = %storage.root().display(), "Storage root resolved");

    let scanner = ClamAVService::from_config(&config.scanner);
    let extractor = OcrTextExtractor::from_config(&config.ocr);

    let upload_service = UploadService::new(
        &config.upload,
        Arc::new(scanner),
        Arc::new(extractor),
        Arc::new(storage),
    );

    // Engines may come up after the API; report, don't fail.
    let engines = upload_service.engine_status().await;
    if !engines.scanner {
        tracing::warn!(
            host = %config.scanner.host,
            port = config.scanner.port,
            policy = %config.scanner_unavailable_policy(),
            "ClamAV daemon not reachable at startup"
        );
    }
    if !engines.extractor {
        tracing::warn!(
            tesseract_path = %config.ocr.tesseract_path,
            "Tesseract not runnable at startup; image text extraction will be skipped"
        );
    }

    Ok(Arc::new(AppState { upload_service }))
}
