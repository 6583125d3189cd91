//! Configuration loading and root folder resolution
//!
//! Configuration lives in a single TOML file. Every section is optional; a
//! missing or partial file falls back to compiled defaults so the service can
//! always start.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `GARAGE_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "GARAGE_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "garage.db";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database
    pub root_folder: Option<String>,
    /// HTTP listen address (e.g. "127.0.0.1:5810")
    pub bind_address: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    /// Price overrides: provider -> package -> cost
    #[serde(default)]
    pub prices: HashMap<String, HashMap<String, f64>>,
    /// Monthly budget limits per provider
    #[serde(default)]
    pub budgets: HashMap<String, f64>,
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// External data provider credentials and endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub dvla_api_key: Option<String>,
    pub dvla_base_url: Option<String>,
    pub dvsa_api_key: Option<String>,
    pub dvsa_client_id: Option<String>,
    pub dvsa_client_secret: Option<String>,
    pub dvsa_token_url: Option<String>,
    pub dvsa_scope: Option<String>,
    pub dvsa_base_url: Option<String>,
    pub vdg_api_key: Option<String>,
    pub vdg_base_url: Option<String>,
    pub sws_api_key: Option<String>,
    pub sws_base_url: Option<String>,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Aggregator behaviour overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub cache_warming_enabled: Option<bool>,
    pub cache_warming_threshold: Option<f64>,
    /// Cache lifetime per data type, in hours
    #[serde(default)]
    pub cache_ttl_hours: HashMap<String, i64>,
}

/// Resolve the root folder following the priority order in the module docs
pub fn resolve_root_folder(cli_arg: Option<&str>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return PathBuf::from(path);
    }

    default_root_folder()
}

/// Path of the SQLite database inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Per-user config file location (`<config dir>/garage/config.toml`)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("garage").join("config.toml"))
}

/// Locate the config file for this platform, if one exists
///
/// Linux checks `~/.config/garage/config.toml` then `/etc/garage/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(path) = user_config_path() {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/garage/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load TOML configuration
///
/// With an explicit path the file must exist and parse. Without one the
/// platform config file is used if present, otherwise defaults are returned.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match find_config_file() {
            Some(p) => p,
            None => {
                warn!("No config file found, using compiled defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write TOML configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;

    // The file may hold provider API keys
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("garage"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/garage"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("garage"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/garage"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("garage"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\garage"))
    } else {
        PathBuf::from("./garage_data")
    }
}
