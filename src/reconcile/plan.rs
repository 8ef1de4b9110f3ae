//! Derives what to do with a fresh suggestion bundle.
//!
//! `derive_plan` is a pure function: suggestion bundle + catalog snapshot +
//! requirement table in, a `ReconcilePlan` out. The session state machine
//! applies the plan; the async orchestration around it (auto-creates,
//! catalog refresh) lives in the route layer.

use uuid::Uuid;

use crate::domain::catalog::{CatalogSnapshot, PropertyUnit, TenantStatus};
use crate::domain::documents::DocumentForm;
use crate::domain::requirements::RequirementsTable;
use crate::domain::suggestions::{AiSuggestionBundle, TenantSuggestion, UnitSuggestion};
use crate::reconcile::matcher;

/// How the suggested unit resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitResolution {
    None,
    Link(Uuid),
    /// Named by the AI but not present in the catalog. The unit is left
    /// unlinked and flagged for manual creation; the engine never invents
    /// one on its own.
    PendingCreate(UnitSuggestion),
}

/// How the suggested tenant resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum TenantResolution {
    None,
    Link(Uuid),
    /// Unmatched and unambiguous: created immediately during extraction
    /// handling.
    AutoCreate(TenantSuggestion),
    /// Unmatched but a close alternative exists in the catalog; creation is
    /// offered to the operator instead of auto-invoked.
    Offer(TenantSuggestion),
}

/// How the suggested contract resolves. Contracts are never auto-created;
/// an unmatched code becomes an offer that stays gated until property,
/// tenant and (where applicable) unit are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractResolution {
    None,
    Link(Uuid),
    Offer(String),
}

/// Everything the state machine needs to merge suggestions into the draft.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    /// Suggested document type, when the bundle carries one.
    pub document_type: Option<String>,
    pub property_id: Option<Uuid>,
    pub unit: UnitResolution,
    pub tenant: TenantResolution,
    pub contract: ContractResolution,
    /// Auto-filled document name; only produced while the form name is
    /// still empty.
    pub name_autofill: Option<String>,
}

pub fn derive_plan(
    bundle: &AiSuggestionBundle,
    service_unit: Option<&PropertyUnit>,
    catalog: &CatalogSnapshot,
    table: &RequirementsTable,
    current_form: &DocumentForm,
) -> ReconcilePlan {
    let suggested_type = bundle
        .document_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let effective_type = suggested_type
        .as_deref()
        .unwrap_or(&current_form.document_type);
    let req = table.resolve(effective_type);

    // Property first: it is load-bearing for unit and contract linking.
    let matched_property = bundle.property.as_ref().and_then(|p| {
        matcher::match_property(&catalog.properties, p.name.as_deref(), p.address.as_deref())
    });
    let property_id = if req.allows_property {
        matched_property.map(|p| p.id).or_else(|| {
            // The extraction service resolved a unit on its side; adopt the
            // unit's owning property when we know it.
            service_unit
                .map(|u| u.property_id)
                .filter(|pid| catalog.property(*pid).is_some())
        })
    } else {
        None
    };

    let unit = resolve_unit(bundle, service_unit, catalog, property_id);
    let tenant = resolve_tenant(bundle, catalog, req.allows_tenant);
    let contract = resolve_contract(bundle, catalog, req.allows_contract);

    let name_autofill = if current_form.name.trim().is_empty() {
        autofill_name(bundle, catalog, &contract, property_id, req)
    } else {
        None
    };

    ReconcilePlan {
        document_type: suggested_type,
        property_id,
        unit,
        tenant,
        contract,
        name_autofill,
    }
}

fn resolve_unit(
    bundle: &AiSuggestionBundle,
    service_unit: Option<&PropertyUnit>,
    catalog: &CatalogSnapshot,
    property_id: Option<Uuid>,
) -> UnitResolution {
    if let (Some(unit), Some(pid)) = (service_unit, property_id) {
        if unit.property_id == pid {
            return UnitResolution::Link(unit.id);
        }
    }

    if let (Some(suggestion), Some(pid)) = (bundle.unit.as_ref(), property_id) {
        if let Some(unit) = matcher::match_unit(
            &catalog.units,
            pid,
            suggestion.code.as_deref(),
            suggestion.name.as_deref(),
        ) {
            return UnitResolution::Link(unit.id);
        }
    }

    match bundle.unit.as_ref() {
        Some(suggestion) if suggestion.is_named() => {
            UnitResolution::PendingCreate(suggestion.clone())
        }
        _ => UnitResolution::None,
    }
}

fn resolve_tenant(
    bundle: &AiSuggestionBundle,
    catalog: &CatalogSnapshot,
    allows_tenant: bool,
) -> TenantResolution {
    let Some(suggestion) = bundle.tenant.as_ref() else {
        return TenantResolution::None;
    };
    if !allows_tenant {
        return TenantResolution::None;
    }

    if let Some(tenant) = matcher::match_tenant(
        &catalog.tenants,
        suggestion.name.as_deref(),
        suggestion.oib.as_deref(),
    ) {
        // An archived tenant is never linked automatically; the operator
        // has to pick it on purpose.
        return if tenant.status == TenantStatus::Archived {
            TenantResolution::None
        } else {
            TenantResolution::Link(tenant.id)
        };
    }

    let named = suggestion
        .name
        .as_deref()
        .is_some_and(|n| !n.trim().is_empty());
    if !named {
        return TenantResolution::None;
    }

    let name = suggestion.name.as_deref().unwrap_or_default();
    if matcher::has_close_tenant_alternative(&catalog.tenants, name) {
        TenantResolution::Offer(suggestion.clone())
    } else {
        TenantResolution::AutoCreate(suggestion.clone())
    }
}

fn resolve_contract(
    bundle: &AiSuggestionBundle,
    catalog: &CatalogSnapshot,
    allows_contract: bool,
) -> ContractResolution {
    let Some(suggestion) = bundle.contract.as_ref() else {
        return ContractResolution::None;
    };
    if !allows_contract {
        return ContractResolution::None;
    }

    if let Some(contract) = matcher::match_contract(&catalog.contracts, suggestion.code.as_deref())
    {
        return ContractResolution::Link(contract.id);
    }

    match suggestion.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => ContractResolution::Offer(code.to_string()),
        _ => ContractResolution::None,
    }
}

/// Document name auto-fill priority: invoice number, then contract
/// reference, then a property-only composed name. First applicable wins.
fn autofill_name(
    bundle: &AiSuggestionBundle,
    catalog: &CatalogSnapshot,
    contract: &ContractResolution,
    property_id: Option<Uuid>,
    req: &crate::domain::requirements::DocumentTypeRequirements,
) -> Option<String> {
    if let Some(invoice) = bundle
        .invoice_number
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        return Some(format!("Račun {invoice}"));
    }

    let contract_code = match contract {
        ContractResolution::Link(id) => catalog
            .contracts
            .iter()
            .find(|c| c.id == *id)
            .map(|c| c.code.clone()),
        ContractResolution::Offer(code) => Some(code.clone()),
        ContractResolution::None => None,
    };
    if let Some(code) = contract_code {
        return Some(format!("{} {}", req.label, code));
    }

    if req.is_property_only() {
        if let Some(property) = property_id.and_then(|pid| catalog.property(pid)) {
            return Some(format!("{} - {}", req.label, property.name));
        }
    }

    None
}
