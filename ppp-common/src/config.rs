//! Configuration loading, root folder and API key resolution
//!
//! Missing or unreadable TOML files never abort startup: callers get defaults
//! and a warning, the same graceful degradation every tool in the workspace uses.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application name used for config and data directories
pub const APP_DIR_NAME: &str = "ppp";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "PPP_ROOT_FOLDER";

/// Logging section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "ppp_ae=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Settings shared by every Podcast Pro Plus tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder holding uploads, templates and rendered episodes
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub openai_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
}

/// Default config file location: `<config_dir>/ppp/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Parse a TOML file into any deserializable config type
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

/// Load a config file, falling back to defaults when it is absent or invalid
///
/// A missing file is expected on first run and only logged at info level;
/// a file that exists but fails to parse is a warning.
pub fn load_toml_config_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> T {
    let Some(path) = path else {
        return T::default();
    };

    if !path.exists() {
        info!("Config file {} not found, using defaults", path.display());
        return T::default();
    }

    match load_toml_config(path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            T::default()
        }
    }
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `PPP_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./ppp_data"))
}

/// Resolve an API key from the environment, then the TOML config
///
/// Warns when both sources define a key, since the environment silently wins.
pub fn resolve_api_key(name: &str, env_var: &str, toml_value: Option<&str>) -> Result<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} found in both environment and TOML config. Using environment.",
            name
        );
    }

    if let Some(key) = env_key {
        info!("{} loaded from environment variable", name);
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("{} loaded from TOML config", name);
        return Ok(key.to_string());
    }

    Err(Error::Config(format!(
        "{} not configured. Set {} or add it to the TOML config",
        name, env_var
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
