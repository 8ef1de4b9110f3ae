mod api;
mod app;
mod config;
mod dashboard;
mod domain;
mod error;
mod logging;
mod middleware;
mod reconcile;
mod routes;
mod services;

use std::path::Path;

use anyhow::Result;

use domain::requirements::RequirementsTable;
use services::{CatalogClient, ExtractionClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting Leaseflow backend"
    );

    // Load the document type requirement table
    let requirements = RequirementsTable::load(Path::new(&settings.document_types_path))?;
    tracing::info!(
        path = %settings.document_types_path,
        "Document type requirements loaded"
    );

    // Create collaborator clients
    let extraction = ExtractionClient::new(
        &settings.extraction_service_url,
        &settings.extraction_service_token,
        settings.extraction_service_timeout_seconds,
    )?;
    let catalog = CatalogClient::new(
        &settings.catalog_service_url,
        &settings.catalog_service_token,
        settings.catalog_service_timeout_seconds,
    )?;

    // Probe the collaborators without blocking startup
    tokio::spawn({
        let extraction = extraction.clone();
        let catalog = catalog.clone();
        async move {
            match extraction.health_check().await {
                Ok(()) => tracing::info!("Extraction service is healthy"),
                Err(e) => tracing::warn!(error = %e, "Extraction service health check failed - will retry on first request"),
            }
            match catalog.health_check().await {
                Ok(()) => tracing::info!("Catalog service is healthy"),
                Err(e) => tracing::warn!(error = %e, "Catalog service health check failed - will retry on first request"),
            }
        }
    });

    // Create application state
    let state = app::AppState::new(settings.clone(), requirements, extraction, catalog);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
