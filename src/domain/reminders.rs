//! Contract reminders surfaced on the dashboard.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reminder type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    #[serde(alias = "istek_ugovora")]
    ContractExpiry,
    #[serde(alias = "obnova_garancije")]
    GuaranteeRenewal,
    #[serde(alias = "indeksacija")]
    Indexation,
}

/// Scheduled notice tied to a contract event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: Uuid,
    pub contract_id: Uuid,
    #[serde(alias = "tip")]
    pub kind: ReminderKind,
    /// Date the reminder is meant to fire; may predate a later contract
    /// change, which is exactly what the validity filter cross-checks.
    #[serde(default, alias = "datum")]
    pub trigger_date: Option<NaiveDate>,
    /// Lead time in days before the contract event.
    #[serde(default, alias = "dani_prije")]
    pub lead_days: Option<i64>,
    #[serde(default, alias = "poslano")]
    pub sent: bool,
}
