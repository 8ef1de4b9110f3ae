//! Wizard step gates and submission validation.
//!
//! Step movement is gated on the way forward only; going back is always
//! allowed. Submission runs its own checks in a fixed order and the first
//! violated rule wins: it blocks the submit, carries a user-facing message,
//! and names the step where the fix belongs so the UI can route there.

use crate::domain::documents::{DocumentForm, UploadedFile, WizardStep};
use crate::domain::requirements::DocumentTypeRequirements;
use crate::reconcile::session::UploadSession;

/// A rejected submission: what is wrong and where to send the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionBlock {
    pub message: String,
    pub step: WizardStep,
}

impl SubmissionBlock {
    fn new(message: impl Into<String>, step: WizardStep) -> Self {
        Self {
            message: message.into(),
            step,
        }
    }
}

impl From<SubmissionBlock> for crate::error::ApiError {
    fn from(block: SubmissionBlock) -> Self {
        Self::Validation {
            message: block.message,
            step: block.step,
        }
    }
}

/// Whether the session may move from its current step to the next one.
///
/// Upload -> metadata needs a file; metadata -> linking needs a name, a
/// selected type and every required metadata field non-blank. The linking
/// step has no forward gate of its own; submission validates independently.
pub fn can_advance(session: &UploadSession, req: &DocumentTypeRequirements) -> bool {
    let form = session.draft.form();
    match session.step {
        WizardStep::Upload => session.file.is_some(),
        WizardStep::Metadata => {
            !form.name.trim().is_empty()
                && !form.document_type.trim().is_empty()
                && first_blank_required_field(form, req).is_none()
        }
        WizardStep::Linking => true,
    }
}

/// Validate a submission attempt. Rules run in order; the first violation
/// blocks.
pub fn validate_submission(
    file: Option<&UploadedFile>,
    form: &DocumentForm,
    req: &DocumentTypeRequirements,
) -> Result<(), SubmissionBlock> {
    if file.is_none() {
        return Err(SubmissionBlock::new(
            "A document file must be uploaded first",
            WizardStep::Upload,
        ));
    }

    if req.requires_property && form.property_id.is_none() {
        return Err(SubmissionBlock::new(
            "This document type requires a property link",
            WizardStep::Linking,
        ));
    }
    if req.requires_tenant && req.allows_tenant && form.tenant_id.is_none() {
        return Err(SubmissionBlock::new(
            "This document type requires a tenant link",
            WizardStep::Linking,
        ));
    }
    if req.requires_contract && req.allows_contract && form.contract_id.is_none() {
        return Err(SubmissionBlock::new(
            "This document type requires a contract link",
            WizardStep::Linking,
        ));
    }

    if let Some(field) = first_blank_required_field(form, req) {
        return Err(SubmissionBlock::new(
            format!("Required field \"{}\" must be filled in", field),
            WizardStep::Metadata,
        ));
    }

    Ok(())
}

/// Label of the first required metadata field without a non-blank value.
fn first_blank_required_field<'a>(
    form: &DocumentForm,
    req: &'a DocumentTypeRequirements,
) -> Option<&'a str> {
    req.required_fields()
        .find(|f| {
            form.metadata
                .get(&f.id)
                .map_or(true, |v| v.trim().is_empty())
        })
        .map(|f| f.label.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::requirements::RequirementsTable;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use uuid::Uuid;

    fn table() -> RequirementsTable {
        let raw: HashMap<String, DocumentTypeRequirements> = serde_json::from_value(json!({
            "racun": {
                "label": "Račun",
                "requires_property": true,
                "requires_tenant": true,
                "metadata_fields": [
                    { "id": "broj_racuna", "label": "Broj računa", "required": true },
                    { "id": "iznos", "label": "Iznos (EUR)", "kind": "number", "required": true }
                ]
            },
            "aneks_ugovora": {
                "label": "Aneks ugovora",
                "requires_property": true,
                "requires_tenant": true,
                "requires_contract": true
            },
            "energetski_certifikat": {
                "label": "Energetski certifikat",
                "requires_property": true,
                "allows_tenant": false,
                "allows_contract": false
            },
            "ostalo": { "label": "Ostalo" }
        }))
        .unwrap();
        RequirementsTable::from_entries(raw)
    }

    fn file() -> UploadedFile {
        UploadedFile {
            file_name: "racun.pdf".into(),
            size: 2048,
            content_type: "application/pdf".into(),
        }
    }

    fn filled_form() -> DocumentForm {
        DocumentForm {
            name: "Račun 12-2025".into(),
            document_type: "Račun".into(),
            property_id: Some(Uuid::new_v4()),
            tenant_id: Some(Uuid::new_v4()),
            metadata: BTreeMap::from([
                ("broj_racuna".to_string(), "12-2025".to_string()),
                ("iznos".to_string(), "500".to_string()),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn upload_step_gates_on_file_presence() {
        let table = table();
        let mut session = UploadSession::new();
        let req = table.resolve("ostalo");

        assert!(!can_advance(&session, req));
        session.begin_extraction(file());
        assert!(can_advance(&session, req));
    }

    #[test]
    fn metadata_step_gates_on_name_type_and_required_fields() {
        let table = table();
        let req = table.resolve("Račun");
        let mut session = UploadSession::new();
        session.step = WizardStep::Metadata;

        // Blank form: gate closed.
        assert!(!can_advance(&session, req));

        *session.draft.form_mut() = filled_form();
        assert!(can_advance(&session, req));

        // Blanking one required field closes the gate again.
        session
            .draft
            .form_mut()
            .metadata
            .insert("iznos".to_string(), "   ".to_string());
        assert!(!can_advance(&session, req));

        session.draft.form_mut().metadata.remove("iznos");
        session.draft.form_mut().name = String::new();
        assert!(!can_advance(&session, req));
    }

    #[test]
    fn first_violation_wins_and_routes_to_its_step() {
        let table = table();
        let req = table.resolve("Račun");

        // Everything is wrong at once: the missing file is reported first.
        let block = validate_submission(None, &DocumentForm::default(), req).unwrap_err();
        assert_eq!(block.step, WizardStep::Upload);

        // File present: missing property comes before missing tenant.
        let f = file();
        let block = validate_submission(Some(&f), &DocumentForm::default(), req).unwrap_err();
        assert_eq!(block.step, WizardStep::Linking);
        assert!(block.message.contains("property"));

        let mut form = filled_form();
        form.tenant_id = None;
        let block = validate_submission(Some(&f), &form, req).unwrap_err();
        assert!(block.message.contains("tenant"));

        // Links resolved, one required field blank: routed to metadata.
        let mut form = filled_form();
        form.metadata.remove("broj_racuna");
        let block = validate_submission(Some(&f), &form, req).unwrap_err();
        assert_eq!(block.step, WizardStep::Metadata);
        assert!(block.message.contains("Broj računa"));

        assert_eq!(validate_submission(Some(&f), &filled_form(), req), Ok(()));
    }

    #[test]
    fn forbidden_links_are_not_demanded() {
        let table = table();
        let req = table.resolve("Energetski certifikat");
        let f = file();

        // Property-only type: tenant/contract absence never blocks.
        let form = DocumentForm {
            name: "Certifikat".into(),
            document_type: "Energetski certifikat".into(),
            property_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert_eq!(validate_submission(Some(&f), &form, req), Ok(()));
    }

    #[test]
    fn required_contract_blocks_submission() {
        let table = table();
        let req = table.resolve("Aneks ugovora");
        let f = file();

        let mut form = filled_form();
        form.document_type = "Aneks ugovora".into();
        form.contract_id = None;
        let block = validate_submission(Some(&f), &form, req).unwrap_err();
        assert_eq!(block.step, WizardStep::Linking);
        assert!(block.message.contains("contract"));

        form.contract_id = Some(Uuid::new_v4());
        assert_eq!(validate_submission(Some(&f), &form, req), Ok(()));
    }
}
