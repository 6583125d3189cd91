//! API usage log and monthly budget tracking

use chrono::{DateTime, Utc};
use garage_common::time::to_db;
use garage_common::Result;
use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::types::{FetchStatus, Provider};

/// One usage-log row (a provider attempt or a cache hit)
#[derive(Debug, Clone)]
pub struct UsageLogEntry {
    pub registration: String,
    pub provider: Provider,
    pub package: String,
    pub cost: f64,
    pub status: FetchStatus,
    pub data_retrieved: bool,
    pub cached_hit: bool,
    pub request_details: Option<Value>,
    pub response_summary: Option<Value>,
}

/// Append a usage-log row
pub async fn insert_usage(pool: &SqlitePool, entry: &UsageLogEntry, at: DateTime<Utc>) -> Result<()> {
    let request_details = entry
        .request_details
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let response_summary = entry
        .response_summary
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO api_usage_log (
            id, registration, provider, package, cost, status,
            data_retrieved, cached_hit, request_details, response_summary, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&entry.registration)
    .bind(entry.provider.as_str())
    .bind(&entry.package)
    .bind(entry.cost)
    .bind(entry.status.as_str())
    .bind(entry.data_retrieved)
    .bind(entry.cached_hit)
    .bind(request_details)
    .bind(response_summary)
    .bind(to_db(at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Spend and limit for one provider in one month
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRow {
    pub provider: String,
    pub month: String,
    pub current_spend: f64,
    pub budget_limit: Option<f64>,
}

impl BudgetRow {
    pub fn over_budget(&self) -> bool {
        self.budget_limit
            .map_or(false, |limit| self.current_spend > limit)
    }
}

fn budget_row(row: &sqlx::sqlite::SqliteRow) -> BudgetRow {
    BudgetRow {
        provider: row.get("provider"),
        month: row.get("month"),
        current_spend: row.get("current_spend"),
        budget_limit: row.get("budget_limit"),
    }
}

/// Add spend for (provider, month), creating the row when missing
///
/// A configured `budget_limit` replaces the stored one; `None` keeps it.
pub async fn add_spend(
    pool: &SqlitePool,
    provider: Provider,
    month: &str,
    cost: f64,
    budget_limit: Option<f64>,
) -> Result<BudgetRow> {
    let row = sqlx::query(
        r#"
        INSERT INTO api_budget_tracking (provider, month, current_spend, budget_limit, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(provider, month) DO UPDATE SET
            current_spend = current_spend + excluded.current_spend,
            budget_limit = COALESCE(excluded.budget_limit, budget_limit),
            updated_at = excluded.updated_at
        RETURNING provider, month, current_spend, budget_limit
        "#,
    )
    .bind(provider.as_str())
    .bind(month)
    .bind(cost)
    .bind(budget_limit)
    .bind(to_db(garage_common::time::now()))
    .fetch_one(pool)
    .await?;

    Ok(budget_row(&row))
}

/// Budget rows for a month, ordered by provider
pub async fn budget_rows(pool: &SqlitePool, month: &str) -> Result<Vec<BudgetRow>> {
    let rows = sqlx::query(
        r#"
        SELECT provider, month, current_spend, budget_limit
        FROM api_budget_tracking
        WHERE month = ?
        ORDER BY provider
        "#,
    )
    .bind(month)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(budget_row).collect())
}

/// Per-provider usage totals for a month
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUsage {
    pub provider: String,
    /// Provider attempts (cache hits excluded)
    pub calls: i64,
    pub cache_hits: i64,
    pub errors: i64,
    pub no_data: i64,
    pub total_cost: f64,
    /// Paid-path cost avoided by cache hits
    pub estimated_savings: f64,
}

/// Summarize the usage log for a `YYYY-MM` month
///
/// `calls` counts logged attempts, not HTTP requests: a mid-tier technical
/// lookup is one row (`SpecAndOptionDetails+TyreDetails`) billing both
/// packages.
pub async fn usage_summary(pool: &SqlitePool, month: &str) -> Result<Vec<ProviderUsage>> {
    let rows = sqlx::query(
        r#"
        SELECT provider,
               SUM(CASE WHEN cached_hit = 0 THEN 1 ELSE 0 END) AS calls,
               SUM(CASE WHEN cached_hit = 1 THEN 1 ELSE 0 END) AS cache_hits,
               SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END) AS errors,
               SUM(CASE WHEN status = 'no_data' THEN 1 ELSE 0 END) AS no_data,
               CAST(COALESCE(SUM(cost), 0) AS REAL) AS total_cost,
               CAST(COALESCE(SUM(CASE WHEN cached_hit = 1
                   THEN json_extract(response_summary, '$.estimatedSaving') END), 0) AS REAL)
                   AS estimated_savings
        FROM api_usage_log
        WHERE substr(created_at, 1, 7) = ?
        GROUP BY provider
        ORDER BY provider
        "#,
    )
    .bind(month)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ProviderUsage {
            provider: row.get("provider"),
            calls: row.get("calls"),
            cache_hits: row.get("cache_hits"),
            errors: row.get("errors"),
            no_data: row.get("no_data"),
            total_cost: row.get("total_cost"),
            estimated_savings: row.get("estimated_savings"),
        })
        .collect())
}

/// Usage-log rows for a registration, oldest first
pub async fn entries_for_registration(pool: &SqlitePool, registration: &str) -> Result<Vec<UsageLogEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT registration, provider, package, cost, status, data_retrieved, cached_hit,
               request_details, response_summary
        FROM api_usage_log
        WHERE registration = ?
        ORDER BY created_at, rowid
        "#,
    )
    .bind(registration)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let provider: String = row.get("provider");
        let status: String = row.get("status");
        let request_details: Option<String> = row.get("request_details");
        let response_summary: Option<String> = row.get("response_summary");

        entries.push(UsageLogEntry {
            registration: row.get("registration"),
            provider: provider.parse().map_err(garage_common::Error::Internal)?,
            package: row.get("package"),
            cost: row.get("cost"),
            status: match status.as_str() {
                "success" => FetchStatus::Success,
                "no_data" => FetchStatus::NoData,
                _ => FetchStatus::Error,
            },
            data_retrieved: row.get("data_retrieved"),
            cached_hit: row.get("cached_hit"),
            request_details: request_details.and_then(|t| serde_json::from_str(&t).ok()),
            response_summary: response_summary.and_then(|t| serde_json::from_str(&t).ok()),
        });
    }

    Ok(entries)
}
