//! Usage and budget reporting
//!
//! `GET /api/usage?month=YYYY-MM` (defaults to the current month)

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::usage::{self, BudgetRow, ProviderUsage};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub month: Option<String>,
}

/// Totals across providers
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub calls: i64,
    pub cache_hits: i64,
    pub total_cost: f64,
    pub estimated_savings: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub month: String,
    pub providers: Vec<ProviderUsage>,
    pub budgets: Vec<BudgetRow>,
    pub totals: UsageTotals,
}

/// Validate a `YYYY-MM` month key
fn parse_month(month: &str) -> Option<String> {
    let month = month.trim();
    let valid = month.len() == 7
        && NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").is_ok();
    valid.then(|| month.to_string())
}

/// GET /api/usage
pub async fn get_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> ApiResult<Json<UsageResponse>> {
    let month = match query.month {
        Some(m) => parse_month(&m)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid month '{}': expected YYYY-MM", m)))?,
        None => garage_common::time::month_key(garage_common::time::now()),
    };

    let providers = usage::usage_summary(&state.db, &month).await?;
    let budgets = usage::budget_rows(&state.db, &month).await?;

    let totals = providers.iter().fold(UsageTotals::default(), |mut acc, p| {
        acc.calls += p.calls;
        acc.cache_hits += p.cache_hits;
        acc.total_cost += p.total_cost;
        acc.estimated_savings += p.estimated_savings;
        acc
    });

    Ok(Json(UsageResponse {
        month,
        providers,
        budgets,
        totals,
    }))
}

/// Build usage routes
pub fn usage_routes() -> Router<AppState> {
    Router::new().route("/api/usage", get(get_usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-03"), Some("2024-03".to_string()));
        assert_eq!(parse_month("2024-13"), None);
        assert_eq!(parse_month("2024-3"), None);
        assert_eq!(parse_month("March"), None);
    }
}
