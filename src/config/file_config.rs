//! Configuration file support.
//!
//! Settings are read from a TOML file and layered with environment variables.
//!
//! # Configuration File Format
//!
//! ```toml
//! [http]
//! timeout_secs = 10
//! requests_per_second = 2.0
//!
//! [concurrency]
//! max_concurrent_lookups = 5
//!
//! [sources]
//! pravo_base_url = "http://publication.pravo.gov.ru"
//! government_base_url = "https://government.ru"
//! consultant_base_url = "https://www.consultant.ru"
//!
//! [policy]
//! default_chain = ["pravo"]
//!
//! [[policy.routes]]
//! doc_type_contains = "Постановление Правительства"
//! checkers = ["pravo", "consultant"]
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! Environment variables use the `NORMDOC_STATUS_` prefix with `__` between
//! nested keys, e.g. `NORMDOC_STATUS_CONCURRENCY__MAX_CONCURRENT_LOOKUPS=3`.

use std::path::{Path, PathBuf};

use super::Config;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "normdoc-status.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "NORMDOC_STATUS";

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Load error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Load configuration from an optional file plus the environment.
///
/// Without a path only defaults and environment variables apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigFileError> {
    load_layered(path, environment())
}

/// `NORMDOC_STATUS_<SECTION>__<KEY>` variables
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_layered(
    path: Option<&Path>,
    environment: config::Environment,
) -> Result<Config, ConfigFileError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigFileError::Io(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder.add_source(environment).build()?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigFileError::Parse(e.to_string()))
}

/// Write a configuration as pretty TOML
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigFileError> {
    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
    }

    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}

/// Per-user configuration directory
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("normdoc-status"))
}

/// Where `config init` writes by default
pub fn default_config_path() -> PathBuf {
    config_dir()
        .map(|d| d.join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Find a config file in the working directory or the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    config_dir()
        .map(|d| d.join("config.toml"))
        .filter(|p| p.is_file())
}
