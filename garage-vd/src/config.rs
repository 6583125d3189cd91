//! Configuration resolution for garage-vd
//!
//! Provider credentials resolve with Database → ENV → TOML priority. A
//! provider whose credentials resolve nowhere is left unconfigured and its
//! fallback chain skips straight to the next provider.

use garage_common::config::TomlConfig;
use garage_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::sources::{
    dvsa, DvlaClient, DvsaClient, DvsaCredentials, HttpSources, SourceError, SwsClient, VdgClient,
    DEFAULT_TIMEOUT_SECS,
};

/// A provider credential and where it can be configured
#[derive(Debug, Clone, Copy)]
pub struct CredentialSpec {
    /// Key in the `settings` table
    pub setting: &'static str,
    /// Environment variable
    pub env_var: &'static str,
    /// Human-readable name for log messages
    pub label: &'static str,
}

pub const DVLA_API_KEY: CredentialSpec = CredentialSpec {
    setting: "dvla_api_key",
    env_var: "GARAGE_DVLA_API_KEY",
    label: "DVLA API key",
};

pub const DVSA_API_KEY: CredentialSpec = CredentialSpec {
    setting: "dvsa_api_key",
    env_var: "GARAGE_DVSA_API_KEY",
    label: "DVSA API key",
};

pub const DVSA_CLIENT_SECRET: CredentialSpec = CredentialSpec {
    setting: "dvsa_client_secret",
    env_var: "GARAGE_DVSA_CLIENT_SECRET",
    label: "DVSA client secret",
};

pub const VDG_API_KEY: CredentialSpec = CredentialSpec {
    setting: "vdg_api_key",
    env_var: "GARAGE_VDG_API_KEY",
    label: "VDG API key",
};

pub const SWS_API_KEY: CredentialSpec = CredentialSpec {
    setting: "sws_api_key",
    env_var: "GARAGE_SWS_API_KEY",
    label: "SWS API key",
};

/// TOML value for a credential setting
fn toml_credential<'a>(config: &'a TomlConfig, setting: &str) -> Option<&'a String> {
    let providers = &config.providers;
    match setting {
        "dvla_api_key" => providers.dvla_api_key.as_ref(),
        "dvsa_api_key" => providers.dvsa_api_key.as_ref(),
        "dvsa_client_secret" => providers.dvsa_client_secret.as_ref(),
        "vdg_api_key" => providers.vdg_api_key.as_ref(),
        "sws_api_key" => providers.sws_api_key.as_ref(),
        _ => None,
    }
}

/// Resolve a credential from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
///
/// Returns `None` when no tier holds a valid value.
pub async fn resolve_credential(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
    spec: CredentialSpec,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_provider_key(db, spec.setting)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(spec.env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_credential(toml_config, spec.setting)
        .filter(|k| is_valid_key(k))
        .cloned();

    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            spec.label,
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(source) = sources.first() {
        info!("{} loaded from {}", spec.label, source);
    }

    Ok(db_key.or(env_key).or(toml_key))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn client_error(provider: &str, err: SourceError) -> Error {
    Error::Config(format!("{} client setup failed: {}", provider, err))
}

/// Build the HTTP-backed sources from resolved credentials
pub async fn build_sources(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<HttpSources> {
    let providers = &toml_config.providers;
    let timeout = Duration::from_secs(providers.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let mut sources = HttpSources::default();

    if let Some(key) = resolve_credential(db, toml_config, DVLA_API_KEY).await? {
        let client = DvlaClient::new(key, providers.dvla_base_url.clone(), timeout)
            .map_err(|e| client_error("DVLA", e))?;
        sources.dvla = Some(client);
    } else {
        warn!("DVLA not configured; basic lookups go straight to VDG");
    }

    let dvsa_key = resolve_credential(db, toml_config, DVSA_API_KEY).await?;
    let dvsa_secret = resolve_credential(db, toml_config, DVSA_CLIENT_SECRET).await?;
    match (
        dvsa_key,
        dvsa_secret,
        providers.dvsa_client_id.clone(),
        providers.dvsa_token_url.clone(),
    ) {
        (Some(api_key), Some(client_secret), Some(client_id), Some(token_url)) => {
            let credentials = DvsaCredentials {
                api_key,
                client_id,
                client_secret,
                token_url,
                scope: providers
                    .dvsa_scope
                    .clone()
                    .unwrap_or_else(|| dvsa::DVSA_DEFAULT_SCOPE.to_string()),
            };
            let client = DvsaClient::new(credentials, providers.dvsa_base_url.clone(), timeout)
                .map_err(|e| client_error("DVSA", e))?;
            sources.dvsa = Some(client);
        }
        _ => warn!("DVSA not fully configured; MOT lookups go straight to VDG"),
    }

    if let Some(key) = resolve_credential(db, toml_config, VDG_API_KEY).await? {
        let client = VdgClient::new(key, providers.vdg_base_url.clone(), timeout)
            .map_err(|e| client_error("VDG", e))?;
        sources.vdg = Some(client);
    } else {
        warn!("VDG not configured; paid lookups will fail");
    }

    if let Some(key) = resolve_credential(db, toml_config, SWS_API_KEY).await? {
        let client = SwsClient::new(key, providers.sws_base_url.clone(), timeout)
            .map_err(|e| client_error("SWS", e))?;
        sources.sws = Some(client);
    } else {
        warn!("SWS not configured; service lookups will fail");
    }

    Ok(sources)
}

// ============================================================================
// Settings Sync and Write-Back
// ============================================================================

/// Sync provider credentials from the database to the TOML file
///
/// HashMap keys are settings names ("vdg_api_key", ...). Write failures are
/// logged and swallowed: the database copy is authoritative.
pub async fn sync_settings_to_toml(settings: HashMap<String, String>, toml_path: &Path) -> Result<()> {
    let mut config = if toml_path.exists() {
        garage_common::config::load_toml_config(Some(toml_path))?
    } else {
        TomlConfig::default()
    };

    let providers = &mut config.providers;
    for (setting, value) in settings {
        let slot = match setting.as_str() {
            "dvla_api_key" => &mut providers.dvla_api_key,
            "dvsa_api_key" => &mut providers.dvsa_api_key,
            "dvsa_client_secret" => &mut providers.dvsa_client_secret,
            "vdg_api_key" => &mut providers.vdg_api_key,
            "sws_api_key" => &mut providers.sws_api_key,
            other => {
                warn!("Not syncing unknown setting '{}' to TOML", other);
                continue;
            }
        };
        *slot = Some(value);
    }

    // Write atomically (best-effort)
    match garage_common::config::write_toml_config(&config, toml_path) {
        Ok(()) => {
            info!("Settings synced to TOML: {}", toml_path.display());
            Ok(())
        }
        Err(e) => {
            warn!("TOML write failed (database write succeeded): {}", e);
            Ok(())
        }
    }
}
