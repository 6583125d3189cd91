//! Settings database operations
//!
//! Key-value accessors over the `settings` table. Provider credentials
//! stored here take priority over environment and TOML configuration.

use garage_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Settings keys holding provider credentials
pub const PROVIDER_KEY_SETTINGS: [&str; 5] = [
    "dvla_api_key",
    "dvsa_api_key",
    "dvsa_client_secret",
    "vdg_api_key",
    "sws_api_key",
];

/// True when `key` names a provider credential setting
pub fn is_provider_key_setting(key: &str) -> bool {
    PROVIDER_KEY_SETTINGS.contains(&key)
}

/// Get a provider credential from the database
///
/// **Returns:** Some(key) if exists, None if not set
pub async fn get_provider_key(db: &Pool<Sqlite>, setting: &str) -> Result<Option<String>> {
    if !is_provider_key_setting(setting) {
        return Err(Error::InvalidInput(format!("Unknown provider key setting: {}", setting)));
    }
    get_setting::<String>(db, setting).await
}

/// Store a provider credential in the database
pub async fn set_provider_key(db: &Pool<Sqlite>, setting: &str, key: String) -> Result<()> {
    if !is_provider_key_setting(setting) {
        return Err(Error::InvalidInput(format!("Unknown provider key setting: {}", setting)));
    }
    set_setting(db, setting, key).await
}

/// Which provider credential settings hold a value (values not exposed)
pub async fn configured_provider_keys(db: &Pool<Sqlite>) -> Result<Vec<String>> {
    let mut configured = Vec::new();
    for setting in PROVIDER_KEY_SETTINGS {
        if let Some(value) = get_setting::<String>(db, setting).await? {
            if !value.trim().is_empty() {
                configured.push(setting.to_string());
            }
        }
    }
    Ok(configured)
}

/// Generic setting getter
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Generic setting setter
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
