//! Stored document lookups and the document type listing.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::error::ApiResult;

/// GET /documents/:document_id
pub async fn get_document(
    Path(document_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    Ok(DataResponse::new(
        state.catalog.get_document(document_id).await?,
    ))
}

/// One entry of the type picker.
#[derive(Debug, Serialize)]
pub struct DocumentTypeView {
    pub key: String,
    pub label: String,
    pub property_only: bool,
}

/// GET /document-types
pub async fn list_document_types(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut types: Vec<DocumentTypeView> = state
        .requirements
        .known_types()
        .map(|(key, req)| DocumentTypeView {
            key: key.clone(),
            label: req.label.clone(),
            property_only: req.is_property_only(),
        })
        .collect();
    types.sort_by(|a, b| a.label.cmp(&b.label));
    DataResponse::new(types)
}
