//! Vehicle data cache
//!
//! Payloads are cached per (registration, data type, provider). An entry is
//! served while `is_valid = 1` and `expiry_at` is in the future; the newest
//! matching entry wins when several providers cached the same type.

use chrono::{DateTime, Duration, Utc};
use garage_common::time::{from_db, to_db};
use garage_common::{Error, Result};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::types::{DataType, Provider};

/// One cached payload
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub id: String,
    pub registration: String,
    pub data_type: DataType,
    pub provider: Provider,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub expiry_at: DateTime<Utc>,
    pub access_count: i64,
}

/// Newest valid, unexpired entry for a registration and data type
pub async fn find_valid(
    pool: &SqlitePool,
    registration: &str,
    data_type: DataType,
    now: DateTime<Utc>,
) -> Result<Option<CacheEntry>> {
    let row = sqlx::query(
        r#"
        SELECT id, registration, data_type, provider, payload, created_at, expiry_at, access_count
        FROM vehicle_data_cache
        WHERE registration = ? AND data_type = ? AND is_valid = 1 AND expiry_at > ?
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(registration)
    .bind(data_type.as_str())
    .bind(to_db(now))
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let provider: String = row.get("provider");
    let provider = provider.parse::<Provider>().map_err(Error::Internal)?;
    let payload: String = row.get("payload");
    let created_at: String = row.get("created_at");
    let expiry_at: String = row.get("expiry_at");

    Ok(Some(CacheEntry {
        id: row.get("id"),
        registration: row.get("registration"),
        data_type,
        provider,
        payload: serde_json::from_str(&payload)?,
        created_at: from_db(&created_at)
            .ok_or_else(|| Error::Internal(format!("Bad cache timestamp: {}", created_at)))?,
        expiry_at: from_db(&expiry_at)
            .ok_or_else(|| Error::Internal(format!("Bad cache timestamp: {}", expiry_at)))?,
        access_count: row.get("access_count"),
    }))
}

/// Write (or refresh) the entry for (registration, data type, provider)
pub async fn store(
    pool: &SqlitePool,
    registration: &str,
    data_type: DataType,
    provider: Provider,
    payload: &Value,
    ttl: Duration,
) -> Result<()> {
    let now = garage_common::time::now();

    sqlx::query(
        r#"
        INSERT INTO vehicle_data_cache (id, registration, data_type, provider, payload, created_at, expiry_at, is_valid)
        VALUES (?, ?, ?, ?, ?, ?, ?, 1)
        ON CONFLICT(registration, data_type, provider) DO UPDATE SET
            payload = excluded.payload,
            created_at = excluded.created_at,
            expiry_at = excluded.expiry_at,
            is_valid = 1
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(registration)
    .bind(data_type.as_str())
    .bind(provider.as_str())
    .bind(serde_json::to_string(payload)?)
    .bind(to_db(now))
    .bind(to_db(now + ttl))
    .execute(pool)
    .await?;

    Ok(())
}

/// Count a cache hit against an entry
pub async fn record_access(pool: &SqlitePool, id: &str, at: DateTime<Utc>) -> Result<()> {
    sqlx::query(
        "UPDATE vehicle_data_cache SET access_count = access_count + 1, last_accessed = ? WHERE id = ?",
    )
    .bind(to_db(at))
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Number of cache rows for a registration (all providers and types)
pub async fn count_entries(pool: &SqlitePool, registration: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM vehicle_data_cache WHERE registration = ?")
            .bind(registration)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
