//! Database schema migrations
//!
//! Versioned migrations let databases created by older builds pick up new
//! columns without manual intervention. Table creation in `init` always
//! produces the current schema, so every migration must be idempotent and
//! skip work that is already done.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - add a new one for each change
//! 2. **Use ALTER TABLE** - preserve existing rows
//! 3. **Check before altering** - `pragma_table_info` guards each column

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

/// Set schema version in database
async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: compliance and code columns on vehicle_data
///
/// Early databases stored only descriptive and technical fields. The
/// reminder screens need MOT/tax dates, and SWS lookups fill the radio code.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    add_columns_if_missing(
        pool,
        "vehicle_data",
        &[
            ("radio_code", "TEXT"),
            ("mot_expiry_date", "TEXT"),
            ("tax_status", "TEXT"),
            ("tax_due_date", "TEXT"),
        ],
    )
    .await
}

/// Migration v2: per-provider budget limits
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    add_columns_if_missing(
        pool,
        "api_budget_tracking",
        &[("budget_limit", "REAL"), ("updated_at", "TEXT")],
    )
    .await
}

/// Add each missing column to `table`; no-op if the table doesn't exist yet
async fn add_columns_if_missing(
    pool: &SqlitePool,
    table: &str,
    columns: &[(&str, &str)],
) -> Result<()> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    if !table_exists {
        info!("  {} table doesn't exist yet - skipping migration", table);
        return Ok(());
    }

    let mut added_count = 0;
    for (column_name, column_type) in columns {
        let has_column: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM pragma_table_info('{}') WHERE name = '{}'",
            table, column_name
        ))
        .fetch_one(pool)
        .await?;

        if has_column > 0 {
            continue;
        }

        match sqlx::query(&format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table, column_name, column_type
        ))
        .execute(pool)
        .await
        {
            Ok(_) => added_count += 1,
            // Another connection beat us to it
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {}
            Err(e) => return Err(e.into()),
        }
    }

    if added_count > 0 {
        info!("  Added {} columns to {}", added_count, table);
    }

    Ok(())
}
