//! Health check handler and response types.

use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatuses {
    pub file_service: &'static str,
    pub scanner: &'static str,
    pub extractor: &'static str,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthCheckResponse {
    pub status: &'static str,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub services: ServiceStatuses,
}

fn up_down(available: bool) -> &'static str {
    if available {
        "UP"
    } else {
        "DOWN"
    }
}

/// The API itself is UP whenever it answers; engine reachability is reported per service.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthCheckResponse> {
    let engines = state.upload_service.engine_status().await;

    Json(HealthCheckResponse {
        status: "UP",
        timestamp: chrono::Utc::now().timestamp_millis(),
        services: ServiceStatuses {
            file_service: up_down(engines.all_available()),
            scanner: up_down(engines.scanner),
            extractor: up_down(engines.extractor),
        },
    })
}
