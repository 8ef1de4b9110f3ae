//! Upload-session state machine.
//!
//! One `UploadSession` lives per uploaded document, from file selection to
//! submission or reset. Phases move `Idle -> AwaitingExtraction ->
//! SuggestionsReady -> UserReviewing -> Submitted`; removing the file drops
//! back to `Idle`.
//!
//! Every file selection bumps the session's extraction generation. An
//! extraction outcome carrying a stale generation is discarded without
//! touching the draft, so a superseded in-flight request can never clobber
//! state written for a newer file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::documents::{DocumentForm, DraftState, UploadedFile, WizardStep};
use crate::domain::requirements::RequirementsTable;
use crate::domain::suggestions::{AiSuggestionBundle, TenantSuggestion, UnitSuggestion};
use crate::reconcile::plan::{ContractResolution, ReconcilePlan, TenantResolution, UnitResolution};

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    AwaitingExtraction,
    SuggestionsReady,
    UserReviewing,
    Submitted,
}

/// Manual edits accepted from the review UI.
///
/// Link fields distinguish "not sent" (leave as is) from an explicit `null`
/// (clear the link), hence the nested options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub property_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub tenant_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub contract_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub unit_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

/// Transient state of one document upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSession {
    pub id: Uuid,
    pub phase: SessionPhase,
    pub step: WizardStep,
    pub file: Option<UploadedFile>,
    pub draft: DraftState,
    /// Extraction generation; bumped on every file selection or removal.
    pub generation: u64,
    pub suggestions: Option<AiSuggestionBundle>,
    /// Unit named by the AI but absent from the catalog, awaiting manual
    /// creation.
    pub pending_unit: Option<UnitSuggestion>,
    /// Tenant creation offered but not auto-invoked (a close alternative
    /// exists in the catalog).
    pub tenant_offer: Option<TenantSuggestion>,
    /// Contract code suggested but unmatched; creation stays gated until
    /// property, tenant and (where applicable) unit are resolved.
    pub contract_offer: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: SessionPhase::Idle,
            step: WizardStep::Upload,
            file: None,
            draft: DraftState::default(),
            generation: 0,
            suggestions: None,
            pending_unit: None,
            tenant_offer: None,
            contract_offer: None,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// File selected: snapshot the manual form, clear previous suggestions
    /// and errors, and hand out the generation the extraction response must
    /// present to be applied.
    pub fn begin_extraction(&mut self, file: UploadedFile) -> u64 {
        let form = self.draft.form().clone();
        self.draft = DraftState::Manual {
            form,
            ai_snapshot: None,
        };
        self.file = Some(file);
        self.suggestions = None;
        self.pending_unit = None;
        self.tenant_offer = None;
        self.contract_offer = None;
        self.last_error = None;
        self.phase = SessionPhase::AwaitingExtraction;
        self.generation += 1;
        self.generation
    }

    /// Extraction failed or was rejected by the service. The draft stays in
    /// manual entry; the message is kept for the UI verbatim.
    pub fn extraction_failed(&mut self, generation: u64, message: impl Into<String>) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.last_error = Some(message.into());
        self.phase = SessionPhase::UserReviewing;
        true
    }

    /// Merge a derived plan into the draft. Returns `false` (and leaves the
    /// session untouched) when the outcome is stale.
    ///
    /// Auto-creation has already happened by the time this runs: the caller
    /// upgrades `TenantResolution::AutoCreate` to `Link` once the create
    /// call succeeds, or downgrades it to `Offer` when it fails.
    pub fn apply_extraction(
        &mut self,
        generation: u64,
        bundle: AiSuggestionBundle,
        plan: ReconcilePlan,
        table: &RequirementsTable,
    ) -> bool {
        if !self.is_current(generation) {
            return false;
        }

        let mut merged = self.draft.form().clone();
        if let Some(doc_type) = &plan.document_type {
            merged.document_type = doc_type.clone();
        }
        let req = table.resolve(&merged.document_type);
        merged.retain_applicable_metadata(req);

        if let Some(property_id) = plan.property_id {
            merged.property_id = Some(property_id);
        }
        if let TenantResolution::Link(id) = plan.tenant {
            merged.tenant_id = Some(id);
        }
        if let ContractResolution::Link(id) = plan.contract {
            merged.contract_id = Some(id);
        }
        if let UnitResolution::Link(id) = plan.unit {
            merged.unit_id = Some(id);
        }
        merged.clear_forbidden_links(req);

        if merged.name.trim().is_empty() {
            if let Some(name) = plan.name_autofill {
                merged.name = name;
            }
        }

        self.pending_unit = match plan.unit {
            UnitResolution::PendingCreate(suggestion) => Some(suggestion),
            _ => None,
        };
        self.tenant_offer = match plan.tenant {
            TenantResolution::Offer(suggestion) => Some(suggestion),
            _ => None,
        };
        self.contract_offer = match plan.contract {
            ContractResolution::Offer(code) => Some(code),
            _ => None,
        };

        self.draft = std::mem::take(&mut self.draft).apply_ai(merged);
        self.suggestions = Some(bundle);
        self.last_error = None;
        self.phase = SessionPhase::SuggestionsReady;
        true
    }

    /// Flip the "apply AI values" switch.
    pub fn toggle_ai(&mut self, apply: bool) {
        self.draft = std::mem::take(&mut self.draft).toggle(apply);
        self.touch();
    }

    /// Change the document type: re-derive the applicable metadata field
    /// set (values of surviving fields are preserved) and clear any link
    /// the new policy forbids.
    pub fn set_document_type(&mut self, raw_type: &str, table: &RequirementsTable) {
        let form = self.draft.form_mut();
        form.document_type = raw_type.trim().to_string();
        let req = table.resolve(&form.document_type);
        form.retain_applicable_metadata(req);
        form.clear_forbidden_links(req);
        self.touch();
    }

    /// Apply manual edits from the review UI.
    pub fn apply_update(&mut self, update: DraftUpdate) {
        let form = self.draft.form_mut();
        if let Some(name) = update.name {
            form.name = name;
        }
        if let Some(description) = update.description {
            form.description = description;
        }
        if let Some(property_id) = update.property_id {
            form.property_id = property_id;
        }
        if let Some(tenant_id) = update.tenant_id {
            form.tenant_id = tenant_id;
        }
        if let Some(contract_id) = update.contract_id {
            form.contract_id = contract_id;
        }
        if let Some(unit_id) = update.unit_id {
            form.unit_id = unit_id;
        }
        for (key, value) in update.metadata {
            if value.is_empty() {
                form.metadata.remove(&key);
            } else {
                form.metadata.insert(key, value);
            }
        }
        self.touch();
    }

    /// Remove the uploaded file: local state resets and any in-flight
    /// extraction becomes stale via the generation bump.
    pub fn remove_file(&mut self) {
        self.file = None;
        self.draft = DraftState::default();
        self.suggestions = None;
        self.pending_unit = None;
        self.tenant_offer = None;
        self.contract_offer = None;
        self.last_error = None;
        self.step = WizardStep::Upload;
        self.phase = SessionPhase::Idle;
        self.generation += 1;
    }

    pub fn mark_submitted(&mut self) {
        self.phase = SessionPhase::Submitted;
    }

    /// Contract creation is the one flow that demands full upstream
    /// resolution first: property, tenant, and the unit too while one is
    /// still pending creation.
    pub fn contract_creation_unlocked(&self) -> bool {
        let form = self.draft.form();
        form.property_id.is_some() && form.tenant_id.is_some() && self.pending_unit.is_none()
    }

    fn touch(&mut self) {
        if self.phase == SessionPhase::SuggestionsReady {
            self.phase = SessionPhase::UserReviewing;
        }
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::requirements::DocumentTypeRequirements;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn table() -> RequirementsTable {
        let raw: HashMap<String, DocumentTypeRequirements> = serde_json::from_value(json!({
            "racun": {
                "label": "Račun",
                "requires_property": true,
                "requires_tenant": true,
                "metadata_fields": [
                    { "id": "broj_racuna", "label": "Broj računa", "required": true },
                    { "id": "iznos", "label": "Iznos (EUR)", "kind": "number" }
                ]
            },
            "energetski_certifikat": {
                "label": "Energetski certifikat",
                "requires_property": true,
                "allows_tenant": false,
                "allows_contract": false,
                "metadata_fields": [
                    { "id": "vrijedi_do", "label": "Vrijedi do", "kind": "date" }
                ]
            },
            "ostalo": { "label": "Ostalo" }
        }))
        .unwrap();
        RequirementsTable::from_entries(raw)
    }

    fn file() -> UploadedFile {
        UploadedFile {
            file_name: "ugovor.pdf".into(),
            size: 1024,
            content_type: "application/pdf".into(),
        }
    }

    fn plan_with(tenant: TenantResolution) -> ReconcilePlan {
        ReconcilePlan {
            document_type: Some("Račun".into()),
            property_id: Some(Uuid::new_v4()),
            unit: UnitResolution::None,
            tenant,
            contract: ContractResolution::None,
            name_autofill: Some("Račun 12-2025".into()),
        }
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut session = UploadSession::new();
        let stale = session.begin_extraction(file());
        // A second file selection supersedes the first extraction.
        let current = session.begin_extraction(file());
        assert!(stale < current);

        let applied = session.apply_extraction(
            stale,
            AiSuggestionBundle::default(),
            plan_with(TenantResolution::None),
            &table(),
        );
        assert!(!applied);
        assert_eq!(session.phase, SessionPhase::AwaitingExtraction);
        assert!(session.suggestions.is_none());

        assert!(!session.extraction_failed(stale, "late failure"));
        assert_eq!(session.last_error, None);
    }

    #[test]
    fn apply_extraction_merges_and_snapshots() {
        let mut session = UploadSession::new();
        let generation = session.begin_extraction(file());

        let plan = plan_with(TenantResolution::Link(Uuid::new_v4()));
        let property_id = plan.property_id;
        assert!(session.apply_extraction(
            generation,
            AiSuggestionBundle::default(),
            plan,
            &table()
        ));

        assert_eq!(session.phase, SessionPhase::SuggestionsReady);
        assert!(session.draft.ai_applied());
        let form = session.draft.form();
        assert_eq!(form.document_type, "Račun");
        assert_eq!(form.property_id, property_id);
        assert!(form.tenant_id.is_some());
        assert_eq!(form.name, "Račun 12-2025");

        // Switching AI values off restores the empty manual snapshot.
        session.toggle_ai(false);
        assert_eq!(session.draft.form().name, "");
        assert_eq!(session.draft.form().tenant_id, None);
    }

    #[test]
    fn property_only_type_change_clears_tenant() {
        let mut session = UploadSession::new();
        let t = table();
        session.apply_update(DraftUpdate {
            tenant_id: Some(Some(Uuid::new_v4())),
            ..Default::default()
        });
        session.set_document_type("Energetski certifikat", &t);

        assert_eq!(session.draft.form().tenant_id, None);
        assert!(t.resolve("Energetski certifikat").is_property_only());
    }

    #[test]
    fn type_change_preserves_surviving_metadata_values() {
        let mut session = UploadSession::new();
        let t = table();
        session.set_document_type("Račun", &t);
        session.apply_update(DraftUpdate {
            metadata: BTreeMap::from([
                ("broj_racuna".to_string(), "12-2025".to_string()),
                ("iznos".to_string(), "500".to_string()),
                ("vrijedi_do".to_string(), "2026-01-01".to_string()),
            ]),
            ..Default::default()
        });
        // Switching type keeps values for fields that remain applicable and
        // prunes the rest.
        session.set_document_type("Energetski certifikat", &t);
        let metadata = &session.draft.form().metadata;
        assert_eq!(metadata.get("vrijedi_do").map(String::as_str), Some("2026-01-01"));
        assert_eq!(metadata.get("broj_racuna"), None);
        assert_eq!(metadata.get("iznos"), None);

        session.set_document_type("Račun", &t);
        assert!(session.draft.form().metadata.is_empty());
    }

    #[test]
    fn extraction_failure_keeps_manual_entry() {
        let mut session = UploadSession::new();
        let generation = session.begin_extraction(file());
        assert!(session.extraction_failed(generation, "Parsiranje nije uspjelo"));
        assert_eq!(session.phase, SessionPhase::UserReviewing);
        assert_eq!(session.last_error.as_deref(), Some("Parsiranje nije uspjelo"));
        assert!(!session.draft.ai_applied());
    }

    #[test]
    fn remove_file_resets_and_supersedes() {
        let mut session = UploadSession::new();
        let generation = session.begin_extraction(file());
        session.remove_file();

        assert_eq!(session.phase, SessionPhase::Idle);
        assert!(session.file.is_none());
        assert!(!session.is_current(generation));
    }

    #[test]
    fn contract_creation_gate_needs_full_upstream_resolution() {
        let mut session = UploadSession::new();
        assert!(!session.contract_creation_unlocked());

        session.apply_update(DraftUpdate {
            property_id: Some(Some(Uuid::new_v4())),
            tenant_id: Some(Some(Uuid::new_v4())),
            ..Default::default()
        });
        assert!(session.contract_creation_unlocked());

        session.pending_unit = Some(UnitSuggestion {
            code: Some("P-99".into()),
            ..Default::default()
        });
        assert!(!session.contract_creation_unlocked());
    }
}
