//! Dashboard aggregation: reminder sanitization and portfolio KPIs.

pub mod reminders;
pub mod summary;
