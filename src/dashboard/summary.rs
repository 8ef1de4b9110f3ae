//! Portfolio KPI tallies for the dashboard header.

use serde::Serialize;

use crate::domain::catalog::{Contract, ContractStatus, PropertyUnit, UnitStatus};

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UnitCounts {
    pub total: usize,
    pub available: usize,
    pub reserved: usize,
    pub leased: usize,
    pub under_maintenance: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ContractCounts {
    pub total: usize,
    pub active: usize,
    pub expiring: usize,
    pub archived: usize,
    pub terminated: usize,
}

/// Headline counts aggregated over the whole portfolio.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PortfolioSummary {
    pub properties: usize,
    pub tenants: usize,
    pub units: UnitCounts,
    pub contracts: ContractCounts,
    /// Valid reminders that have not been sent yet.
    pub open_reminders: usize,
}

pub fn summarize(
    property_count: usize,
    tenant_count: usize,
    contracts: &[Contract],
    units: &[PropertyUnit],
    open_reminders: usize,
) -> PortfolioSummary {
    let mut unit_counts = UnitCounts {
        total: units.len(),
        ..Default::default()
    };
    for unit in units {
        match unit.status {
            UnitStatus::Available => unit_counts.available += 1,
            UnitStatus::Reserved => unit_counts.reserved += 1,
            UnitStatus::Leased => unit_counts.leased += 1,
            UnitStatus::UnderMaintenance => unit_counts.under_maintenance += 1,
        }
    }

    let mut contract_counts = ContractCounts {
        total: contracts.len(),
        ..Default::default()
    };
    for contract in contracts {
        match contract.status {
            ContractStatus::Active => contract_counts.active += 1,
            ContractStatus::Expiring => contract_counts.expiring += 1,
            ContractStatus::Archived => contract_counts.archived += 1,
            ContractStatus::Terminated => contract_counts.terminated += 1,
        }
    }

    PortfolioSummary {
        properties: property_count,
        tenants: tenant_count,
        units: unit_counts,
        contracts: contract_counts,
        open_reminders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn unit(status: UnitStatus) -> PropertyUnit {
        PropertyUnit {
            id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            code: "P-1".into(),
            name: "Prostor".into(),
            floor: None,
            area_m2: None,
            status,
        }
    }

    fn contract(status: ContractStatus) -> Contract {
        Contract {
            id: Uuid::new_v4(),
            code: "UG".into(),
            property_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            unit_id: None,
            status,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn tallies_by_status() {
        let units = vec![
            unit(UnitStatus::Available),
            unit(UnitStatus::Leased),
            unit(UnitStatus::Leased),
            unit(UnitStatus::UnderMaintenance),
        ];
        let contracts = vec![
            contract(ContractStatus::Active),
            contract(ContractStatus::Active),
            contract(ContractStatus::Expiring),
            contract(ContractStatus::Terminated),
        ];

        let summary = summarize(3, 5, &contracts, &units, 2);
        assert_eq!(summary.properties, 3);
        assert_eq!(summary.tenants, 5);
        assert_eq!(summary.units.total, 4);
        assert_eq!(summary.units.leased, 2);
        assert_eq!(summary.units.reserved, 0);
        assert_eq!(summary.contracts.active, 2);
        assert_eq!(summary.contracts.expiring, 1);
        assert_eq!(summary.contracts.terminated, 1);
        assert_eq!(summary.open_reminders, 2);
    }
}
