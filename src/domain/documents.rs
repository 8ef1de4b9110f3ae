//! Document draft state for one upload session.
//!
//! The draft exists only between upload and submission; it is discarded on
//! reset, cancel, or successful submission. Manual and AI-derived versions of
//! the form are kept side by side as immutable snapshots so the "apply AI
//! values" switch can restore either one losslessly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::catalog::PropertyUnit;
use crate::domain::requirements::DocumentTypeRequirements;

/// Wizard steps: upload, then metadata, then linking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Upload,
    Metadata,
    Linking,
}

impl WizardStep {
    pub fn index(&self) -> u8 {
        match self {
            Self::Upload => 0,
            Self::Metadata => 1,
            Self::Linking => 2,
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Upload => Some(Self::Metadata),
            Self::Metadata => Some(Self::Linking),
            Self::Linking => None,
        }
    }

    pub fn prev(&self) -> Option<Self> {
        match self {
            Self::Upload => None,
            Self::Metadata => Some(Self::Upload),
            Self::Linking => Some(Self::Metadata),
        }
    }
}

/// Descriptor of the uploaded PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub size: u64,
    pub content_type: String,
}

/// User-correctable form describing how the document links into the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Raw type string as selected or suggested; resolved via the
    /// requirements table wherever policy matters.
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub property_id: Option<Uuid>,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub contract_id: Option<Uuid>,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    /// Type-specific metadata values keyed by field id.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DocumentForm {
    /// Clear every link the given policy forbids. Runs on every document
    /// type change.
    pub fn clear_forbidden_links(&mut self, req: &DocumentTypeRequirements) {
        if !req.allows_property {
            self.property_id = None;
        }
        if !req.allows_tenant {
            self.tenant_id = None;
        }
        if !req.allows_contract {
            self.contract_id = None;
        }
        // A unit link cannot outlive its property link.
        if self.property_id.is_none() {
            self.unit_id = None;
        }
    }

    /// Keep only metadata values whose field still applies to the type.
    pub fn retain_applicable_metadata(&mut self, req: &DocumentTypeRequirements) {
        self.metadata.retain(|id, _| req.field(id).is_some());
    }

    /// A unit link is only valid while the unit belongs to the selected
    /// property. `units` is the unit list of the currently selected
    /// property; anything else clears the link.
    pub fn enforce_unit_scope(&mut self, units: &[PropertyUnit]) {
        let Some(unit_id) = self.unit_id else { return };
        let valid = self.property_id.is_some()
            && units
                .iter()
                .any(|u| u.id == unit_id && Some(u.property_id) == self.property_id);
        if !valid {
            self.unit_id = None;
        }
    }
}

/// Manual vs. AI-applied form state.
///
/// Both snapshots are immutable copies taken at the moment of divergence,
/// not live-recomputed; toggling in either direction is total and
/// side-effect free.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DraftState {
    Manual {
        form: DocumentForm,
        /// Most recent AI-derived snapshot, kept so the switch can be
        /// turned back on losslessly.
        #[serde(default)]
        ai_snapshot: Option<DocumentForm>,
    },
    AiApplied {
        form: DocumentForm,
        ai_snapshot: DocumentForm,
        manual_snapshot: DocumentForm,
    },
}

impl Default for DraftState {
    fn default() -> Self {
        Self::Manual {
            form: DocumentForm::default(),
            ai_snapshot: None,
        }
    }
}

impl DraftState {
    pub fn form(&self) -> &DocumentForm {
        match self {
            Self::Manual { form, .. } | Self::AiApplied { form, .. } => form,
        }
    }

    pub fn form_mut(&mut self) -> &mut DocumentForm {
        match self {
            Self::Manual { form, .. } | Self::AiApplied { form, .. } => form,
        }
    }

    pub fn ai_applied(&self) -> bool {
        matches!(self, Self::AiApplied { .. })
    }

    /// Record a freshly derived AI form. The current form becomes the
    /// manual snapshot; the merged form becomes both the live form and the
    /// AI snapshot.
    pub fn apply_ai(self, merged: DocumentForm) -> Self {
        let manual_snapshot = match self {
            Self::Manual { form, .. } => form,
            Self::AiApplied {
                manual_snapshot, ..
            } => manual_snapshot,
        };
        Self::AiApplied {
            form: merged.clone(),
            ai_snapshot: merged,
            manual_snapshot,
        }
    }

    /// Flip the "apply AI values" switch. A no-op when already in the
    /// requested mode or when no AI snapshot exists yet.
    pub fn toggle(self, apply: bool) -> Self {
        match (self, apply) {
            (
                Self::Manual {
                    form,
                    ai_snapshot: Some(ai),
                },
                true,
            ) => Self::AiApplied {
                form: ai.clone(),
                ai_snapshot: ai,
                manual_snapshot: form,
            },
            (
                Self::AiApplied {
                    ai_snapshot,
                    manual_snapshot,
                    ..
                },
                false,
            ) => Self::Manual {
                form: manual_snapshot,
                ai_snapshot: Some(ai_snapshot),
            },
            (state, _) => state,
        }
    }
}

/// Submission payload handed to the persistence service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub document_type: String,
    #[serde(default)]
    pub property_id: Option<Uuid>,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub contract_id: Option<Uuid>,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub file_name: String,
    pub ai_suggestions_applied: bool,
}

/// Stored document record as returned by the persistence service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub document_type: String,
    #[serde(default)]
    pub property_id: Option<Uuid>,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub contract_id: Option<Uuid>,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub file_name: String,
    #[serde(default)]
    pub ai_suggestions_applied: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form(name: &str) -> DocumentForm {
        DocumentForm {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn toggle_round_trip_is_lossless() {
        let manual = form("manual entry");
        let ai = form("ai entry");

        let state = DraftState::Manual {
            form: manual.clone(),
            ai_snapshot: None,
        };
        let applied = state.apply_ai(ai.clone());
        assert!(applied.ai_applied());
        assert_eq!(applied.form(), &ai);

        let off = applied.toggle(false);
        assert!(!off.ai_applied());
        assert_eq!(off.form(), &manual);

        let on = off.toggle(true);
        assert!(on.ai_applied());
        assert_eq!(on.form(), &ai);
    }

    #[test]
    fn forbidden_property_takes_the_unit_with_it() {
        use crate::domain::requirements::DocumentTypeRequirements;

        let mut form = DocumentForm {
            property_id: Some(Uuid::new_v4()),
            unit_id: Some(Uuid::new_v4()),
            tenant_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let req = DocumentTypeRequirements {
            allows_property: false,
            ..Default::default()
        };

        form.clear_forbidden_links(&req);
        assert_eq!(form.property_id, None);
        assert_eq!(form.unit_id, None);
        // Tenant stays: the policy only forbade the property.
        assert!(form.tenant_id.is_some());
    }

    #[test]
    fn toggle_without_ai_snapshot_is_a_noop() {
        let state = DraftState::Manual {
            form: form("only manual"),
            ai_snapshot: None,
        };
        let toggled = state.toggle(true);
        assert!(!toggled.ai_applied());
        assert_eq!(toggled.form().name, "only manual");
    }

    #[test]
    fn unit_scope_clears_foreign_units() {
        use crate::domain::catalog::{PropertyUnit, UnitStatus};

        let property = Uuid::new_v4();
        let other_property = Uuid::new_v4();
        let unit = PropertyUnit {
            id: Uuid::new_v4(),
            property_id: other_property,
            code: "P-1".into(),
            name: "Prostor 1".into(),
            floor: None,
            area_m2: None,
            status: UnitStatus::Available,
        };

        let mut form = DocumentForm {
            property_id: Some(property),
            unit_id: Some(unit.id),
            ..Default::default()
        };

        // Unit belongs to a different property: link must clear.
        form.enforce_unit_scope(std::slice::from_ref(&unit));
        assert_eq!(form.unit_id, None);

        // Same unit under the right property survives.
        let owned = PropertyUnit {
            property_id: property,
            ..unit.clone()
        };
        form.unit_id = Some(owned.id);
        form.enforce_unit_scope(std::slice::from_ref(&owned));
        assert_eq!(form.unit_id, Some(owned.id));

        // No property selected: unit cannot stand alone.
        form.property_id = None;
        form.enforce_unit_scope(std::slice::from_ref(&owned));
        assert_eq!(form.unit_id, None);
    }
}
