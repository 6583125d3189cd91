//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies connection pragmas and
//! creates every table idempotently before running versioned migrations.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows request handlers to read while a lookup is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// The pool is pinned to a single connection that never expires, since every
/// SQLite `:memory:` connection would otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_vehicle_data_table(pool).await?;
    create_vehicle_data_cache_table(pool).await?;
    create_api_usage_log_table(pool).await?;
    create_api_budget_tracking_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores key-value pairs such as provider API keys.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the normalized vehicle record table (one row per registration)
pub async fn create_vehicle_data_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehicle_data (
            registration TEXT PRIMARY KEY,
            vin TEXT,
            make TEXT,
            model TEXT,
            year INTEGER,
            fuel_type TEXT,
            derivative TEXT,
            color TEXT,
            engine_capacity_cc INTEGER,
            power_bhp REAL,
            torque_nm REAL,
            fuel_economy_mpg REAL,
            co2_emissions REAL,
            euro_status TEXT,
            image_url TEXT,
            image_expiry TEXT,
            engine_code TEXT,
            radio_code TEXT,
            tyre_size_front TEXT,
            tyre_size_rear TEXT,
            tyre_pressure_front TEXT,
            tyre_pressure_rear TEXT,
            service_interval TEXT,
            mot_expiry_date TEXT,
            tax_status TEXT,
            tax_due_date TEXT,
            technical_specs TEXT,
            service_data TEXT,
            data_sources TEXT NOT NULL DEFAULT '{}',
            last_update TEXT NOT NULL,
            completeness_score INTEGER NOT NULL DEFAULT 0,
            CHECK (completeness_score >= 0 AND completeness_score <= 100)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the per-provider payload cache
pub async fn create_vehicle_data_cache_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehicle_data_cache (
            id TEXT PRIMARY KEY,
            registration TEXT NOT NULL,
            data_type TEXT NOT NULL,
            provider TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL,
            expiry_at TEXT NOT NULL,
            is_valid INTEGER NOT NULL DEFAULT 1,
            access_count INTEGER NOT NULL DEFAULT 0,
            last_accessed TEXT,
            UNIQUE (registration, data_type, provider)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_vehicle_data_cache_lookup ON vehicle_data_cache(registration, data_type, expiry_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the append-only usage log
pub async fn create_api_usage_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_usage_log (
            id TEXT PRIMARY KEY,
            registration TEXT NOT NULL,
            provider TEXT NOT NULL,
            package TEXT NOT NULL,
            cost REAL NOT NULL DEFAULT 0.0,
            status TEXT NOT NULL,
            data_retrieved INTEGER NOT NULL DEFAULT 0,
            cached_hit INTEGER NOT NULL DEFAULT 0,
            request_details TEXT,
            response_summary TEXT,
            created_at TEXT NOT NULL,
            CHECK (status IN ('success', 'error', 'no_data')),
            CHECK (cost >= 0.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_api_usage_log_created_at ON api_usage_log(created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_api_usage_log_registration ON api_usage_log(registration)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the monthly spend counters
pub async fn create_api_budget_tracking_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_budget_tracking (
            provider TEXT NOT NULL,
            month TEXT NOT NULL,
            current_spend REAL NOT NULL DEFAULT 0.0,
            budget_limit REAL,
            updated_at TEXT,
            PRIMARY KEY (provider, month)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
