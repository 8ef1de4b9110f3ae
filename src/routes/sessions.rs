//! Upload-session endpoints: the server-side driver of the document wizard.
//!
//! The upload handler runs one fixed sequence per file: extraction first,
//! then matching against a fresh catalog snapshot, then any tenant
//! auto-creation, then the merge into the draft. Every response a client
//! sees is the same `SessionView`, so the UI always renders from one shape.
//!
//! A second upload supersedes the first via the session's generation
//! counter; whichever extraction response arrives with a stale generation is
//! dropped on the floor.

use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::domain::catalog::NewContract;
use crate::domain::documents::{DocumentForm, NewDocument, UploadedFile};
use crate::domain::requirements::{DocumentTypeRequirements, MetadataFieldSpec, RequirementsTable};
use crate::domain::suggestions::{
    percent_label, AiSuggestionBundle, TenantSuggestion, UnitSuggestion,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::request_id::RequestIdExt;
use crate::reconcile::matcher;
use crate::reconcile::plan::{derive_plan, TenantResolution};
use crate::reconcile::session::{DraftUpdate, SessionPhase, UploadSession};
use crate::reconcile::validate;

/// Client-facing view of one upload session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub phase: SessionPhase,
    pub step: u8,
    pub file: Option<UploadedFile>,
    pub ai_applied: bool,
    pub form: DocumentForm,
    pub suggestions: Option<AiSuggestionBundle>,
    pub pending_unit: Option<UnitSuggestion>,
    pub tenant_offer: Option<TenantSuggestion>,
    pub contract_offer: Option<String>,
    pub contract_creation_unlocked: bool,
    pub last_error: Option<String>,
    pub requirements: RequirementsView,
}

/// Resolved policy for the session's current document type.
#[derive(Debug, Serialize)]
pub struct RequirementsView {
    pub label: String,
    pub requires_property: bool,
    pub requires_tenant: bool,
    pub requires_contract: bool,
    pub allows_property: bool,
    pub allows_tenant: bool,
    pub allows_contract: bool,
    pub property_only: bool,
    pub metadata_fields: Vec<MetadataFieldSpec>,
}

impl RequirementsView {
    fn from_requirements(req: &DocumentTypeRequirements) -> Self {
        Self {
            label: req.label.clone(),
            requires_property: req.requires_property,
            requires_tenant: req.requires_tenant,
            requires_contract: req.requires_contract,
            allows_property: req.allows_property,
            allows_tenant: req.allows_tenant,
            allows_contract: req.allows_contract,
            property_only: req.is_property_only(),
            metadata_fields: req.metadata_fields.clone(),
        }
    }
}

impl SessionView {
    fn build(session: UploadSession, table: &RequirementsTable) -> Self {
        let req = table.resolve(&session.draft.form().document_type);
        let requirements = RequirementsView::from_requirements(req);
        let ai_applied = session.draft.ai_applied();
        let contract_creation_unlocked = session.contract_creation_unlocked();
        let form = session.draft.form().clone();
        Self {
            id: session.id,
            phase: session.phase,
            step: session.step.index(),
            file: session.file,
            ai_applied,
            contract_creation_unlocked,
            form,
            suggestions: session.suggestions,
            pending_unit: session.pending_unit,
            tenant_offer: session.tenant_offer,
            contract_offer: session.contract_offer,
            last_error: session.last_error,
            requirements,
        }
    }
}

fn session_view(state: &AppState, id: Uuid) -> ApiResult<DataResponse<SessionView>> {
    let session = state.sessions.get(id)?;
    Ok(DataResponse::new(SessionView::build(
        session,
        &state.requirements,
    )))
}

/// Open a fresh upload session.
///
/// POST /sessions
pub async fn create_session(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let session = state.sessions.create();
    tracing::info!(session_id = %session.id, "Upload session opened");
    Ok(Created(DataResponse::new(SessionView::build(
        session,
        &state.requirements,
    ))))
}

/// GET /sessions/:session_id
pub async fn get_session(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    session_view(&state, session_id)
}

/// Cancel a session and discard its draft.
///
/// DELETE /sessions/:session_id
pub async fn cancel_session(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    state.sessions.remove(session_id)?;
    tracing::info!(session_id = %session_id, "Upload session cancelled");
    Ok(NoContent)
}

/// Upload a file and drive extraction + reconciliation.
///
/// POST /sessions/:session_id/file
pub async fn upload_file(
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let request_id = headers.request_id().map(str::to_string);

    let (file_name, content_type, bytes) = read_file_field(&mut multipart).await?;
    let descriptor = UploadedFile {
        file_name: file_name.clone(),
        size: bytes.len() as u64,
        content_type: content_type.clone(),
    };

    // Snapshot the manual form and obtain the generation this extraction
    // must present to be applied.
    let (generation, form_before) = state.sessions.update(session_id, |s| {
        (s.begin_extraction(descriptor), s.draft.form().clone())
    })?;
    let property_hint = form_before.property_id.map(|p| p.to_string());

    // Extraction runs to completion before anything is matched.
    let outcome = match state
        .extraction
        .parse_pdf_contract(
            &file_name,
            &content_type,
            bytes,
            property_hint.as_deref(),
            request_id.as_deref(),
        )
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            // Recoverable: the draft falls back to fully manual entry.
            let message = e.to_string();
            state
                .sessions
                .update(session_id, |s| s.extraction_failed(generation, message))?;
            return session_view(&state, session_id);
        }
    };

    if !outcome.success {
        // The service's own message goes to the user verbatim.
        let message = outcome
            .message
            .unwrap_or_else(|| "Document could not be parsed".to_string());
        state
            .sessions
            .update(session_id, |s| s.extraction_failed(generation, message))?;
        return session_view(&state, session_id);
    }

    let bundle = outcome.data.unwrap_or_default();
    tracing::debug!(
        document_type = bundle.document_type.as_deref().unwrap_or("-"),
        property_confidence = %percent_label(bundle.property.as_ref().and_then(|p| p.confidence)),
        tenant_confidence = %percent_label(bundle.tenant.as_ref().and_then(|t| t.confidence)),
        "Extraction suggestions received"
    );
    let service_unit = outcome
        .created_property_unit
        .or(outcome.matched_property_unit);

    // Matching needs the current catalogs. Without them there is nothing
    // safe to auto-apply, so the draft stays manual.
    let mut snapshot = match state.catalog.snapshot(None).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let message = format!("Suggestions were not applied: {e}");
            state
                .sessions
                .update(session_id, |s| s.extraction_failed(generation, message))?;
            return session_view(&state, session_id);
        }
    };

    // Scope the unit list to the property the document appears to belong
    // to: the AI-suggested one, the service-resolved unit's owner, or the
    // operator's prior selection.
    let suggested_property = bundle
        .property
        .as_ref()
        .and_then(|p| {
            matcher::match_property(&snapshot.properties, p.name.as_deref(), p.address.as_deref())
        })
        .map(|p| p.id);
    let unit_scope = suggested_property
        .or_else(|| service_unit.as_ref().map(|u| u.property_id))
        .or(form_before.property_id);
    if let Some(property_id) = unit_scope {
        match state.catalog.get_units(property_id).await {
            Ok(units) => snapshot.units = units,
            Err(e) => {
                tracing::warn!(error = %e, property_id = %property_id, "Unit list fetch failed; matching without units")
            }
        }
    }

    let mut plan = derive_plan(
        &bundle,
        service_unit.as_ref(),
        &snapshot,
        &state.requirements,
        &form_before,
    );

    // An unmatched, unambiguous tenant is created right away; a failed
    // create degrades to an offer instead of losing the suggestion.
    if let TenantResolution::AutoCreate(suggestion) =
        std::mem::replace(&mut plan.tenant, TenantResolution::None)
    {
        plan.tenant = match auto_create_tenant(&state, &suggestion).await {
            Some(tenant_id) => TenantResolution::Link(tenant_id),
            None => TenantResolution::Offer(suggestion),
        };
    }

    let applied = state.sessions.update(session_id, |s| {
        s.apply_extraction(generation, bundle, plan, &state.requirements)
    })?;
    if !applied {
        tracing::info!(session_id = %session_id, generation, "Discarding superseded extraction result");
    }

    session_view(&state, session_id)
}

async fn auto_create_tenant(state: &AppState, suggestion: &TenantSuggestion) -> Option<Uuid> {
    let payload = suggestion.to_new_tenant()?;
    match state.catalog.create_tenant(&payload).await {
        Ok(tenant) => {
            tracing::info!(tenant_id = %tenant.id, name = %tenant.name, "Tenant created from extraction suggestion");
            Some(tenant.id)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Tenant auto-creation failed; keeping it as an offer");
            None
        }
    }
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("document.pdf").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/pdf")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?
            .to_vec();
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }
        return Ok((file_name, content_type, bytes));
    }
    Err(ApiError::BadRequest(
        "Multipart field \"file\" is required".to_string(),
    ))
}

/// Remove the uploaded file; any in-flight extraction becomes stale.
///
/// DELETE /sessions/:session_id/file
pub async fn remove_file(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    state.sessions.update(session_id, |s| s.remove_file())?;
    session_view(&state, session_id)
}

/// Manual edits to the draft.
///
/// PATCH /sessions/:session_id/draft
pub async fn update_draft(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<DraftUpdate>,
) -> ApiResult<impl IntoResponse> {
    let form = state.sessions.update(session_id, |s| {
        s.apply_update(update);
        s.draft.form().clone()
    })?;

    // Re-enforce the unit/property scope after the edit.
    if form.unit_id.is_some() {
        match form.property_id {
            None => {
                state
                    .sessions
                    .update(session_id, |s| s.draft.form_mut().unit_id = None)?;
            }
            Some(property_id) => match state.catalog.get_units(property_id).await {
                Ok(units) => {
                    state.sessions.update(session_id, |s| {
                        s.draft.form_mut().enforce_unit_scope(&units)
                    })?;
                }
                Err(e) => {
                    // Leave the link in place rather than clearing it on a
                    // failed lookup; the next recomputation will settle it.
                    tracing::warn!(error = %e, property_id = %property_id, "Unit scope check skipped");
                }
            },
        }
    }

    session_view(&state, session_id)
}

#[derive(Debug, Deserialize)]
pub struct SetDocumentType {
    pub document_type: String,
}

/// Change the document type, re-deriving fields and clearing forbidden
/// links.
///
/// PUT /sessions/:session_id/document-type
pub async fn set_document_type(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetDocumentType>,
) -> ApiResult<impl IntoResponse> {
    state.sessions.update(session_id, |s| {
        s.set_document_type(&body.document_type, &state.requirements)
    })?;
    session_view(&state, session_id)
}

#[derive(Debug, Deserialize)]
pub struct AiValuesToggle {
    pub apply: bool,
}

/// Flip the "apply AI values" switch between the two snapshots.
///
/// PUT /sessions/:session_id/ai-values
pub async fn toggle_ai_values(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<AiValuesToggle>,
) -> ApiResult<impl IntoResponse> {
    state
        .sessions
        .update(session_id, |s| s.toggle_ai(body.apply))?;
    session_view(&state, session_id)
}

/// Move to the next wizard step, if the current one is complete.
///
/// POST /sessions/:session_id/advance
pub async fn advance_step(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let moved = state.sessions.update(session_id, |s| {
        let req = state.requirements.resolve(&s.draft.form().document_type);
        if !validate::can_advance(s, req) {
            return Err("The current step is not complete");
        }
        match s.step.next() {
            Some(next) => {
                s.step = next;
                Ok(())
            }
            None => Err("Already at the last step"),
        }
    })?;
    moved.map_err(|message| ApiError::Conflict(message.to_string()))?;
    session_view(&state, session_id)
}

/// Move back one wizard step; going back is never gated.
///
/// POST /sessions/:session_id/back
pub async fn back_step(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let moved = state.sessions.update(session_id, |s| match s.step.prev() {
        Some(prev) => {
            s.step = prev;
            Ok(())
        }
        None => Err("Already at the first step"),
    })?;
    moved.map_err(|message| ApiError::Conflict(message.to_string()))?;
    session_view(&state, session_id)
}

/// Validate and persist the document.
///
/// POST /sessions/:session_id/submit
pub async fn submit(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let session = state.sessions.get(session_id)?;
    if session.phase == SessionPhase::Submitted {
        return Err(ApiError::Conflict(
            "Session was already submitted".to_string(),
        ));
    }

    let form = session.draft.form().clone();
    let req = state.requirements.resolve(&form.document_type);
    let file = session.file.clone();
    validate::validate_submission(file.as_ref(), &form, req)?;
    let Some(file) = file else {
        return Err(ApiError::Conflict(
            "Upload session has no file".to_string(),
        ));
    };

    let payload = NewDocument {
        name: form.name.trim().to_string(),
        description: form.description,
        document_type: form.document_type,
        property_id: form.property_id,
        tenant_id: form.tenant_id,
        contract_id: form.contract_id,
        unit_id: form.unit_id,
        metadata: form.metadata,
        file_name: file.file_name,
        ai_suggestions_applied: session.draft.ai_applied(),
    };

    // A failed create leaves the draft untouched; the user can retry.
    let record = state.catalog.create_document(&payload).await?;
    state
        .sessions
        .update(session_id, |s| s.mark_submitted())?;
    tracing::info!(session_id = %session_id, document_id = %record.id, "Document submitted");

    Ok(Created(DataResponse::new(record)))
}

/// Accept the offered tenant creation and link the result.
///
/// POST /sessions/:session_id/offers/tenant
pub async fn accept_tenant_offer(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let session = state.sessions.get(session_id)?;
    let Some(suggestion) = session.tenant_offer else {
        return Err(ApiError::Conflict(
            "No tenant creation is offered for this session".to_string(),
        ));
    };
    let payload = suggestion.to_new_tenant().ok_or_else(|| {
        ApiError::Conflict("Offered tenant has no usable name".to_string())
    })?;

    let tenant = state.catalog.create_tenant(&payload).await?;
    state.sessions.update(session_id, |s| {
        s.apply_update(DraftUpdate {
            tenant_id: Some(Some(tenant.id)),
            ..Default::default()
        });
        s.tenant_offer = None;
    })?;
    tracing::info!(session_id = %session_id, tenant_id = %tenant.id, "Offered tenant created and linked");

    session_view(&state, session_id)
}

/// Create the unit the AI named but the catalog lacks, then link it.
/// Requires a resolved property; the unit inherits that scope.
///
/// POST /sessions/:session_id/offers/unit
pub async fn create_pending_unit(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let session = state.sessions.get(session_id)?;
    let Some(suggestion) = session.pending_unit else {
        return Err(ApiError::Conflict(
            "No unit creation is pending for this session".to_string(),
        ));
    };
    let Some(property_id) = session.draft.form().property_id else {
        return Err(ApiError::Conflict(
            "A property must be linked before creating the unit".to_string(),
        ));
    };
    let payload = suggestion.to_new_unit(property_id).ok_or_else(|| {
        ApiError::Conflict("Pending unit has no usable code or name".to_string())
    })?;

    let unit = state.catalog.create_unit(&payload).await?;
    state.sessions.update(session_id, |s| {
        s.apply_update(DraftUpdate {
            unit_id: Some(Some(unit.id)),
            ..Default::default()
        });
        s.pending_unit = None;
    })?;
    tracing::info!(session_id = %session_id, unit_id = %unit.id, "Pending unit created and linked");

    session_view(&state, session_id)
}

/// Create the suggested contract. Gated on full upstream resolution:
/// property and tenant linked, and no unit still pending creation.
///
/// POST /sessions/:session_id/offers/contract
pub async fn create_offered_contract(
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let session = state.sessions.get(session_id)?;
    let Some(code) = session.contract_offer.clone() else {
        return Err(ApiError::Conflict(
            "No contract creation is offered for this session".to_string(),
        ));
    };
    if session.pending_unit.is_some() {
        return Err(ApiError::Conflict(
            "The suggested unit must be created or dismissed first".to_string(),
        ));
    }
    let form = session.draft.form();
    let (Some(property_id), Some(tenant_id)) = (form.property_id, form.tenant_id) else {
        return Err(ApiError::Conflict(
            "Property and tenant must be linked before creating a contract".to_string(),
        ));
    };

    let payload = NewContract {
        code,
        property_id,
        tenant_id,
        unit_id: form.unit_id,
    };
    let contract = state.catalog.create_contract(&payload).await?;
    state.sessions.update(session_id, |s| {
        s.apply_update(DraftUpdate {
            contract_id: Some(Some(contract.id)),
            ..Default::default()
        });
        s.contract_offer = None;
    })?;
    tracing::info!(session_id = %session_id, contract_id = %contract.id, "Offered contract created and linked");

    session_view(&state, session_id)
}
