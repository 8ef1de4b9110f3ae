pub mod catalog;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod sessions;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Upload sessions (document wizard)
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/:session_id", get(sessions::get_session))
        .route("/sessions/:session_id", delete(sessions::cancel_session))
        .route("/sessions/:session_id/file", post(sessions::upload_file))
        .route("/sessions/:session_id/file", delete(sessions::remove_file))
        .route("/sessions/:session_id/draft", patch(sessions::update_draft))
        .route(
            "/sessions/:session_id/document-type",
            put(sessions::set_document_type),
        )
        .route(
            "/sessions/:session_id/ai-values",
            put(sessions::toggle_ai_values),
        )
        .route("/sessions/:session_id/advance", post(sessions::advance_step))
        .route("/sessions/:session_id/back", post(sessions::back_step))
        .route("/sessions/:session_id/submit", post(sessions::submit))
        // Creation offers derived from suggestions
        .route(
            "/sessions/:session_id/offers/tenant",
            post(sessions::accept_tenant_offer),
        )
        .route(
            "/sessions/:session_id/offers/unit",
            post(sessions::create_pending_unit),
        )
        .route(
            "/sessions/:session_id/offers/contract",
            post(sessions::create_offered_contract),
        )
        // Catalog (manual linking flows)
        .route("/catalog/properties", post(catalog::create_property))
        .route("/catalog/properties", get(catalog::list_properties))
        .route(
            "/catalog/properties/:property_id/units",
            post(catalog::create_unit),
        )
        .route(
            "/catalog/properties/:property_id/units",
            get(catalog::list_units),
        )
        .route("/catalog/tenants", post(catalog::create_tenant))
        .route("/catalog/tenants", get(catalog::list_tenants))
        .route("/catalog/contracts", post(catalog::create_contract))
        .route("/catalog/contracts", get(catalog::list_contracts))
        // Stored documents and the type picker
        .route("/documents/:document_id", get(documents::get_document))
        .route("/document-types", get(documents::list_document_types))
        // Dashboard
        .route("/dashboard/reminders", get(dashboard::list_reminders))
        .route("/dashboard/summary", get(dashboard::portfolio_summary))
}
