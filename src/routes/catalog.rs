//! Catalog proxy endpoints backing the manual linking flows.
//!
//! When a suggestion misses or the operator overrides it, the UI needs the
//! entity lists to pick from and a way to create what is missing. These
//! handlers forward to the persistence service one-to-one.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{Created, DataResponse};
use crate::app::AppState;
use crate::domain::catalog::{NewContract, NewProperty, NewPropertyUnit, NewTenant};
use crate::error::ApiResult;

/// GET /catalog/properties
pub async fn list_properties(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(DataResponse::new(state.catalog.get_properties().await?))
}

/// POST /catalog/properties
pub async fn create_property(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewProperty>,
) -> ApiResult<impl IntoResponse> {
    Ok(Created(DataResponse::new(
        state.catalog.create_property(&payload).await?,
    )))
}

/// GET /catalog/tenants
pub async fn list_tenants(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(DataResponse::new(state.catalog.get_tenants().await?))
}

/// POST /catalog/tenants
pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewTenant>,
) -> ApiResult<impl IntoResponse> {
    Ok(Created(DataResponse::new(
        state.catalog.create_tenant(&payload).await?,
    )))
}

/// GET /catalog/contracts
pub async fn list_contracts(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(DataResponse::new(state.catalog.get_contracts().await?))
}

/// POST /catalog/contracts
pub async fn create_contract(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewContract>,
) -> ApiResult<impl IntoResponse> {
    Ok(Created(DataResponse::new(
        state.catalog.create_contract(&payload).await?,
    )))
}

/// GET /catalog/properties/:property_id/units
pub async fn list_units(
    Path(property_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    Ok(DataResponse::new(state.catalog.get_units(property_id).await?))
}

/// Unit creation body; the owning property comes from the path.
#[derive(Debug, Deserialize)]
pub struct CreateUnitBody {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub area_m2: Option<f64>,
}

/// POST /catalog/properties/:property_id/units
pub async fn create_unit(
    Path(property_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUnitBody>,
) -> ApiResult<impl IntoResponse> {
    let payload = NewPropertyUnit {
        property_id,
        code: body.code,
        name: body.name,
        floor: body.floor,
        area_m2: body.area_m2,
    };
    Ok(Created(DataResponse::new(
        state.catalog.create_unit(&payload).await?,
    )))
}
