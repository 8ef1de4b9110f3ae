//! Dashboard feeds: sanitized reminders and portfolio KPIs.

use axum::extract::{Query, State};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::pagination::{Paginated, PaginationParams};
use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::dashboard::reminders::filter_valid;
use crate::dashboard::summary::{summarize, PortfolioSummary};
use crate::domain::catalog::Contract;
use crate::domain::reminders::Reminder;
use crate::error::ApiResult;

/// Which reminder feed to serve. "Active" is the unsent subset; both feeds
/// run through the same validity filter.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderFeed {
    #[default]
    Active,
    All,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReminderQuery {
    #[serde(default)]
    pub feed: ReminderFeed,
}

/// GET /dashboard/reminders?feed=active|all
pub async fn list_reminders(
    Query(query): Query<ReminderQuery>,
    Query(pagination): Query<PaginationParams>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Paginated<Reminder>> {
    let (reminders, contracts) = futures::try_join!(
        state.catalog.get_reminders(),
        state.catalog.get_contracts(),
    )?;
    let contracts: HashMap<Uuid, Contract> = contracts.into_iter().map(|c| (c.id, c)).collect();

    let mut feed = filter_valid(&reminders, &contracts, Utc::now().date_naive());
    if query.feed == ReminderFeed::Active {
        feed.retain(|r| !r.sent);
    }

    Ok(Paginated::from_items(feed, &pagination))
}

/// GET /dashboard/summary
pub async fn portfolio_summary(
    State(state): State<Arc<AppState>>,
) -> ApiResult<DataResponse<PortfolioSummary>> {
    let (properties, tenants, contracts, reminders) = futures::try_join!(
        state.catalog.get_properties(),
        state.catalog.get_tenants(),
        state.catalog.get_contracts(),
        state.catalog.get_reminders(),
    )?;

    // Unit lists are fetched per property; a failed list degrades the
    // counts instead of failing the whole summary.
    let unit_lists =
        futures::future::join_all(properties.iter().map(|p| state.catalog.get_units(p.id))).await;
    let mut units = Vec::new();
    for result in unit_lists {
        match result {
            Ok(mut list) => units.append(&mut list),
            Err(e) => {
                tracing::warn!(error = %e, "Unit list fetch failed; summary counts may be incomplete")
            }
        }
    }

    let contract_map: HashMap<Uuid, Contract> =
        contracts.iter().cloned().map(|c| (c.id, c)).collect();
    let open_reminders = filter_valid(&reminders, &contract_map, Utc::now().date_naive())
        .into_iter()
        .filter(|r| !r.sent)
        .count();

    Ok(DataResponse::new(summarize(
        properties.len(),
        tenants.len(),
        &contracts,
        &units,
        open_reminders,
    )))
}
