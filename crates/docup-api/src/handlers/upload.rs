use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::upload::extract_multipart_file;
use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use docup_core::{ScanFallbackPolicy, UploadRequest, UploadResult};
use serde::Serialize;
use std::sync::Arc;

/// Body returned for a stored upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    pub ocr_text: String,
    pub uploaded_at: DateTime<Utc>,
    pub virus_scan_passed: bool,
    /// Root-relative storage key; absolute server paths are never returned.
    pub storage_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl From<UploadResult> for UploadResponse {
    fn from(result: UploadResult) -> Self {
        Self {
            filename: result.filename,
            size: result.size,
            mime_type: result.mime_type,
            ocr_text: result.extracted_text,
            uploaded_at: result.uploaded_at,
            virus_scan_passed: result.scan_passed,
            storage_path: result.descriptor.storage_key,
            checksum: result.descriptor.checksum,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInfoResponse {
    pub max_file_size: String,
    pub max_file_size_bytes: usize,
    pub allowed_types: Vec<String>,
    pub features: Vec<&'static str>,
    pub scanner_unavailable_policy: ScanFallbackPolicy,
}

#[tracing::instrument(skip(state, multipart))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let (data, original_filename, content_type) = extract_multipart_file(multipart).await?;

    let result = state
        .upload_service
        .upload(UploadRequest::new(original_filename, content_type, data))
        .await?;

    Ok(Json(result.into()))
}

pub async fn upload_info(State(state): State<Arc<AppState>>) -> Json<UploadInfoResponse> {
    let validator = state.upload_service.validator();

    Json(UploadInfoResponse {
        max_file_size: format_size(validator.max_file_size()),
        max_file_size_bytes: validator.max_file_size(),
        allowed_types: validator.allowed_extensions().to_vec(),
        features: vec!["virus-scan", "ocr", "pdf-text", "checksum"],
        scanner_unavailable_policy: state.upload_service.scan_policy(),
    })
}

/// Human-readable size, e.g. `10MB`.
fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}
