//! Reminder validity filter.
//!
//! The reminder feed is denormalized from contract data and can go stale
//! whenever a contract is archived, terminated, or gets a new end date after
//! reminders were generated. `filter_valid` drops every reminder the owning
//! contract no longer backs. It is a pure function of its inputs, idempotent,
//! and order-preserving; the same filter runs over the "active" and "all"
//! feeds independently.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::domain::catalog::Contract;
use crate::domain::reminders::{Reminder, ReminderKind};

/// Expiry reminders older than this many days past the contract end are
/// always dropped.
const STALE_CUTOFF_DAYS: i64 = 14;

/// Tolerance around an explicit lead time, in days, both directions.
const LEAD_WINDOW_DAYS: i64 = 7;

/// Lookahead applied when a reminder carries no explicit lead time.
const DEFAULT_LOOKAHEAD_DAYS: i64 = 7;

/// Allowed drift between a reminder's stored trigger date and the date its
/// lead time implies from the current contract end.
const TRIGGER_DRIFT_TOLERANCE_DAYS: i64 = 2;

/// Drop every reminder its owning contract no longer supports.
pub fn filter_valid(
    reminders: &[Reminder],
    contracts: &HashMap<Uuid, Contract>,
    today: NaiveDate,
) -> Vec<Reminder> {
    reminders
        .iter()
        .filter(|r| is_valid(r, contracts, today))
        .cloned()
        .collect()
}

fn is_valid(reminder: &Reminder, contracts: &HashMap<Uuid, Contract>, today: NaiveDate) -> bool {
    let Some(contract) = contracts.get(&reminder.contract_id) else {
        return false;
    };
    if contract.status.is_closed() {
        return false;
    }
    if reminder.kind != ReminderKind::ContractExpiry {
        return true;
    }

    // Expiry reminders are anchored to the contract end date; without one
    // there is no window to validate against.
    let Some(end_date) = contract.end_date else {
        return false;
    };
    let days_until = (end_date - today).num_days();
    if days_until < -STALE_CUTOFF_DAYS {
        return false;
    }

    match reminder.lead_days {
        Some(lead) => {
            let lower = (lead - LEAD_WINDOW_DAYS).max(0);
            let upper = lead + LEAD_WINDOW_DAYS;
            if days_until < lower || days_until > upper {
                return false;
            }
            // Cross-check the stored trigger date against the one the
            // current end date implies; a large drift means the reminder
            // was computed under a different contract end.
            if let Some(trigger) = reminder.trigger_date {
                let expected = end_date - Duration::days(lead);
                if (trigger - expected).num_days().abs() > TRIGGER_DRIFT_TOLERANCE_DAYS {
                    return false;
                }
            }
            true
        }
        None => days_until <= DEFAULT_LOOKAHEAD_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::ContractStatus;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 4).unwrap()
    }

    fn cid(i: u128) -> Uuid {
        Uuid::from_u128(i)
    }

    fn contract(i: u128, status: ContractStatus, end_in_days: Option<i64>) -> Contract {
        Contract {
            id: cid(i),
            code: format!("UG-{i}"),
            property_id: cid(100 + i),
            tenant_id: cid(200 + i),
            unit_id: None,
            status,
            start_date: None,
            end_date: end_in_days.map(|d| today() + Duration::days(d)),
        }
    }

    fn expiry(contract: u128, lead_days: Option<i64>) -> Reminder {
        Reminder {
            id: Uuid::new_v4(),
            contract_id: cid(contract),
            kind: ReminderKind::ContractExpiry,
            trigger_date: None,
            lead_days,
            sent: false,
        }
    }

    fn contracts(items: Vec<Contract>) -> HashMap<Uuid, Contract> {
        items.into_iter().map(|c| (c.id, c)).collect()
    }

    #[test]
    fn orphaned_and_closed_contracts_drop_their_reminders() {
        let map = contracts(vec![
            contract(1, ContractStatus::Archived, Some(20)),
            contract(2, ContractStatus::Terminated, Some(20)),
            contract(3, ContractStatus::Active, Some(20)),
        ]);
        let reminders = vec![
            expiry(1, Some(14)),
            expiry(2, Some(14)),
            expiry(3, Some(14)),
            expiry(9, Some(14)), // no such contract
        ];

        let valid = filter_valid(&reminders, &map, today());
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].contract_id, cid(3));
    }

    #[test]
    fn lead_time_window_brackets_days_until() {
        // Contract ends in 20 days. Lead 14 -> window [7, 21] contains 20;
        // lead 5 -> window [0, 12] does not.
        let map = contracts(vec![contract(1, ContractStatus::Active, Some(20))]);

        assert_eq!(filter_valid(&[expiry(1, Some(14))], &map, today()).len(), 1);
        assert_eq!(filter_valid(&[expiry(1, Some(5))], &map, today()).len(), 0);
    }

    #[test]
    fn lower_window_bound_clamps_to_zero() {
        // Lead 3 -> window [0, 10]. A contract expiring today is inside it;
        // one already expired is below the clamped bound.
        let map = contracts(vec![
            contract(1, ContractStatus::Active, Some(0)),
            contract(2, ContractStatus::Active, Some(-3)),
        ]);
        assert_eq!(filter_valid(&[expiry(1, Some(3))], &map, today()).len(), 1);
        assert_eq!(filter_valid(&[expiry(2, Some(3))], &map, today()).len(), 0);
    }

    #[test]
    fn default_lookahead_applies_without_lead() {
        let map = contracts(vec![
            contract(1, ContractStatus::Active, Some(5)),
            contract(2, ContractStatus::Active, Some(10)),
            contract(3, ContractStatus::Active, Some(-10)),
            contract(4, ContractStatus::Active, Some(-20)),
        ]);

        // Within 7 days: valid. Further out: not yet due.
        assert_eq!(filter_valid(&[expiry(1, None)], &map, today()).len(), 1);
        assert_eq!(filter_valid(&[expiry(2, None)], &map, today()).len(), 0);
        // Recently expired stays visible up to the stale cutoff.
        assert_eq!(filter_valid(&[expiry(3, None)], &map, today()).len(), 1);
        assert_eq!(filter_valid(&[expiry(4, None)], &map, today()).len(), 0);
    }

    #[test]
    fn far_past_expiry_is_dropped_regardless_of_lead() {
        let map = contracts(vec![contract(1, ContractStatus::Active, Some(-15))]);
        assert_eq!(filter_valid(&[expiry(1, Some(30))], &map, today()).len(), 0);
    }

    #[test]
    fn trigger_date_drift_invalidates() {
        let end = today() + Duration::days(20);
        let map = contracts(vec![contract(1, ContractStatus::Active, Some(20))]);

        let mut ok = expiry(1, Some(14));
        ok.trigger_date = Some(end - Duration::days(14) - Duration::days(2));
        assert_eq!(filter_valid(&[ok], &map, today()).len(), 1);

        // The trigger was computed under an older end date.
        let mut drifted = expiry(1, Some(14));
        drifted.trigger_date = Some(end - Duration::days(14) - Duration::days(8));
        assert_eq!(filter_valid(&[drifted], &map, today()).len(), 0);
    }

    #[test]
    fn missing_end_date_drops_expiry_but_not_other_kinds() {
        let map = contracts(vec![contract(1, ContractStatus::Active, None)]);

        assert_eq!(filter_valid(&[expiry(1, Some(14))], &map, today()).len(), 0);

        let indexation = Reminder {
            kind: ReminderKind::Indexation,
            ..expiry(1, None)
        };
        assert_eq!(filter_valid(&[indexation], &map, today()).len(), 1);
    }

    #[test]
    fn filtering_preserves_feed_order() {
        let map = contracts(vec![contract(1, ContractStatus::Active, Some(20))]);
        let reminders: Vec<Reminder> = (0..4).map(|_| expiry(1, Some(14))).collect();

        let valid = filter_valid(&reminders, &map, today());
        let ids: Vec<Uuid> = valid.iter().map(|r| r.id).collect();
        let expected: Vec<Uuid> = reminders.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected);
    }

    fn arb_status() -> impl Strategy<Value = ContractStatus> {
        prop_oneof![
            Just(ContractStatus::Active),
            Just(ContractStatus::Expiring),
            Just(ContractStatus::Archived),
            Just(ContractStatus::Terminated),
        ]
    }

    fn arb_kind() -> impl Strategy<Value = ReminderKind> {
        prop_oneof![
            Just(ReminderKind::ContractExpiry),
            Just(ReminderKind::GuaranteeRenewal),
            Just(ReminderKind::Indexation),
        ]
    }

    fn arb_contracts() -> impl Strategy<Value = HashMap<Uuid, Contract>> {
        proptest::collection::vec((arb_status(), proptest::option::of(-40i64..40)), 0..5).prop_map(
            |entries| {
                contracts(
                    entries
                        .into_iter()
                        .enumerate()
                        .map(|(i, (status, end))| contract(i as u128, status, end))
                        .collect(),
                )
            },
        )
    }

    fn arb_reminder() -> impl Strategy<Value = Reminder> {
        (
            0u128..8, // may point past the contract pool
            arb_kind(),
            proptest::option::of(-40i64..40),
            proptest::option::of(0i64..30),
            any::<bool>(),
        )
            .prop_map(|(contract, kind, trigger_off, lead_days, sent)| Reminder {
                id: Uuid::new_v4(),
                contract_id: cid(contract),
                kind,
                trigger_date: trigger_off.map(|d| today() + Duration::days(d)),
                lead_days,
                sent,
            })
    }

    proptest! {
        #[test]
        fn filtering_is_idempotent(
            reminders in proptest::collection::vec(arb_reminder(), 0..32),
            contracts in arb_contracts(),
        ) {
            let once = filter_valid(&reminders, &contracts, today());
            let twice = filter_valid(&once, &contracts, today());
            prop_assert_eq!(once, twice);
        }
    }
}
