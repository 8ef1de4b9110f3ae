use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub extraction_service: String,
    pub catalog_service: String,
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    // Check both collaborators in parallel
    let (extraction_result, catalog_result) = tokio::join!(
        state.extraction.health_check(),
        state.catalog.health_check(),
    );

    let extraction_status = if extraction_result.is_ok() { "ok" } else { "error" };
    let catalog_status = if catalog_result.is_ok() { "ok" } else { "error" };

    // The catalog is the critical dependency; extraction outages only
    // degrade the wizard to manual entry.
    let status = if extraction_result.is_ok() && catalog_result.is_ok() {
        "healthy"
    } else if catalog_result.is_ok() {
        "degraded"
    } else {
        "unhealthy"
    };

    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                extraction_service: extraction_status.to_string(),
                catalog_service: catalog_status.to_string(),
            },
        }),
    )
}
