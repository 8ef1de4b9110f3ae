//! Fuzzy matching of AI-suggested fragments against catalog snapshots.
//!
//! Every matcher is a pure function over a borrowed candidate collection and
//! returns at most one best match. No match is a normal outcome and is
//! reported as `None`, never as an error; the caller then defers to manual
//! entry or a creation flow. First matching candidate in encounter order
//! wins, so results are deterministic for a given snapshot.

use uuid::Uuid;

use crate::domain::catalog::{Contract, Property, PropertyUnit, Tenant};

/// Trim + lowercase. All comparisons run on this form.
fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn normalize_opt(s: Option<&str>) -> Option<String> {
    let n = normalize(s?);
    if n.is_empty() {
        None
    } else {
        Some(n)
    }
}

/// Equal, or either side contains the other. Both sides must be non-empty;
/// a blank fragment never matches anything.
fn loose_eq(candidate: &str, suggested: &str) -> bool {
    if candidate.is_empty() || suggested.is_empty() {
        return false;
    }
    candidate == suggested || candidate.contains(suggested) || suggested.contains(candidate)
}

/// Match a suggested property by name and/or address.
pub fn match_property<'a>(
    properties: &'a [Property],
    name: Option<&str>,
    address: Option<&str>,
) -> Option<&'a Property> {
    let name = normalize_opt(name);
    let address = normalize_opt(address);
    if name.is_none() && address.is_none() {
        return None;
    }

    properties.iter().find(|p| {
        let by_name = name
            .as_deref()
            .is_some_and(|n| loose_eq(&normalize(&p.name), n));
        let by_address = address.as_deref().is_some_and(|a| {
            p.address
                .as_deref()
                .is_some_and(|pa| loose_eq(&normalize(pa), a))
        });
        by_name || by_address
    })
}

/// Match a suggested tenant. An exact tax-id (`oib`) match takes priority
/// over any name similarity; otherwise exact or substring name match.
pub fn match_tenant<'a>(
    tenants: &'a [Tenant],
    name: Option<&str>,
    oib: Option<&str>,
) -> Option<&'a Tenant> {
    if let Some(oib) = normalize_opt(oib) {
        if let Some(tenant) = tenants
            .iter()
            .find(|t| t.oib.as_deref().map(normalize).as_deref() == Some(oib.as_str()))
        {
            return Some(tenant);
        }
    }

    let name = normalize_opt(name)?;
    tenants.iter().find(|t| loose_eq(&normalize(&t.name), &name))
}

/// Match a suggested contract by its internal reference code. Exact match
/// only; there is no fuzzy fallback for contracts.
pub fn match_contract<'a>(contracts: &'a [Contract], code: Option<&str>) -> Option<&'a Contract> {
    let code = normalize_opt(code)?;
    contracts.iter().find(|c| normalize(&c.code) == code)
}

/// Match a suggested unit within one property's unit list: exact code match
/// first, then exact display-name match.
pub fn match_unit<'a>(
    units: &'a [PropertyUnit],
    property_id: Uuid,
    code: Option<&str>,
    name: Option<&str>,
) -> Option<&'a PropertyUnit> {
    let scoped = || units.iter().filter(|u| u.property_id == property_id);

    if let Some(code) = normalize_opt(code) {
        if let Some(unit) = scoped().find(|u| normalize(&u.code) == code) {
            return Some(unit);
        }
    }

    let name = normalize_opt(name)?;
    scoped().find(|u| normalize(&u.name) == name)
}

/// Whether the catalog holds a tenant that could plausibly be the suggested
/// one without matching outright. Used to decide if an unmatched suggestion
/// is unambiguous enough for immediate auto-creation: two names sharing
/// their leading token (e.g. "Alfa d.o.o." vs "Alfa commerce") count as
/// close.
pub fn has_close_tenant_alternative(tenants: &[Tenant], name: &str) -> bool {
    let Some(name) = normalize_opt(Some(name)) else {
        return false;
    };
    let Some(lead) = name.split_whitespace().next() else {
        return false;
    };

    tenants.iter().any(|t| {
        normalize(&t.name)
            .split_whitespace()
            .next()
            .is_some_and(|candidate_lead| candidate_lead == lead)
    })
}
