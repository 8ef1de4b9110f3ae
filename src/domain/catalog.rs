//! Catalog entities owned by the persistence store.
//!
//! The engine only ever sees these as read-mostly snapshots fetched from the
//! persistence service; it requests creates through the service and waits for
//! a refresh instead of mutating them locally.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Archived,
}

impl Default for TenantStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Contract status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Expiring,
    Archived,
    Terminated,
}

impl ContractStatus {
    /// Contracts in these states no longer drive reminders or new links.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Archived | Self::Terminated)
    }
}

/// Property unit status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Available,
    Reserved,
    Leased,
    UnderMaintenance,
}

/// Real-estate asset record (building, land parcel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    #[serde(alias = "naziv")]
    pub name: String,
    #[serde(default, alias = "adresa")]
    pub address: Option<String>,
}

/// Lessee entity (company or individual).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    #[serde(alias = "naziv")]
    pub name: String,
    #[serde(default)]
    pub oib: Option<String>,
    #[serde(default)]
    pub status: TenantStatus,
}

/// Lease agreement linking a tenant to a property/unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    /// Internal reference code, e.g. `UG-2024-017`.
    #[serde(alias = "interna_oznaka")]
    pub code: String,
    pub property_id: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    pub status: ContractStatus,
    #[serde(default, alias = "datum_pocetka")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, alias = "datum_isteka")]
    pub end_date: Option<NaiveDate>,
}

/// Leasable subdivision of a property (office suite, storage, parking).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyUnit {
    pub id: Uuid,
    pub property_id: Uuid,
    #[serde(alias = "oznaka")]
    pub code: String,
    #[serde(alias = "naziv")]
    pub name: String,
    #[serde(default, alias = "etaza")]
    pub floor: Option<String>,
    #[serde(default, alias = "povrsina")]
    pub area_m2: Option<f64>,
    pub status: UnitStatus,
}

/// Creation payload for a property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProperty {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// Creation payload for a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTenant {
    pub name: String,
    #[serde(default)]
    pub oib: Option<String>,
}

/// Creation payload for a unit under one property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPropertyUnit {
    pub property_id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub area_m2: Option<f64>,
}

/// Creation payload for a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContract {
    pub code: String,
    pub property_id: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
}

/// Point-in-time view of the catalogs the matcher works against.
///
/// Passed explicitly into the matcher and planner; never held as ambient
/// global state. `units` holds the unit lists fetched so far (typically the
/// ones belonging to the suggested/selected property).
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub properties: Vec<Property>,
    pub tenants: Vec<Tenant>,
    pub contracts: Vec<Contract>,
    pub units: Vec<PropertyUnit>,
}

impl CatalogSnapshot {
    pub fn property(&self, id: Uuid) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }
}
