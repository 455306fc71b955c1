//! Configuration management.

mod file_config;

pub use file_config::{
    config_dir, default_config_path, find_config_file, load_config, save_config,
    ConfigFileError, CONFIG_FILE_NAME, ENV_PREFIX,
};

use serde::{Deserialize, Serialize};

use crate::sources::{CONSULTANT_ID, GOVERNMENT_ID, PRAVO_ID};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Outbound HTTP settings shared by all checkers
    #[serde(default)]
    pub http: HttpConfig,

    /// Admission gate settings
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Where each checker sends its requests
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Which checkers run for which document types
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// TCP/TLS connect timeout in seconds
    #[serde(default = "default_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept")]
    pub accept: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Client-side request rate limit; unset means unlimited
    #[serde(default)]
    pub requests_per_second: Option<f32>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
            requests_per_second: None,
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_accept() -> String {
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string()
}

fn default_accept_language() -> String {
    "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7".to_string()
}

/// Concurrency configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Maximum lookups past the admission gate at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_lookups: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    5
}

/// Base URLs of the external registries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_pravo_url")]
    pub pravo_base_url: String,

    #[serde(default = "default_government_url")]
    pub government_base_url: String,

    #[serde(default = "default_consultant_url")]
    pub consultant_base_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            pravo_base_url: default_pravo_url(),
            government_base_url: default_government_url(),
            consultant_base_url: default_consultant_url(),
        }
    }
}

fn default_pravo_url() -> String {
    "http://publication.pravo.gov.ru".to_string()
}

fn default_government_url() -> String {
    "https://government.ru".to_string()
}

fn default_consultant_url() -> String {
    "https://www.consultant.ru".to_string()
}

/// Routing table for the resolution policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Checker chain used when no route matches
    #[serde(default = "default_chain")]
    pub default_chain: Vec<String>,

    /// Routes tried in order; the first match wins
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteConfig>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_chain: default_chain(),
            routes: default_routes(),
        }
    }
}

/// One routing rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Case-insensitive substring of the document type
    pub doc_type_contains: String,

    /// Checker ids, tried in order
    pub checkers: Vec<String>,
}

fn default_chain() -> Vec<String> {
    vec![PRAVO_ID.to_string()]
}

fn default_routes() -> Vec<RouteConfig> {
    vec![RouteConfig {
        doc_type_contains: "Постановление Правительства".to_string(),
        checkers: vec![PRAVO_ID.to_string(), CONSULTANT_ID.to_string()],
    }]
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Ids of every checker the application knows how to build
pub fn known_checker_ids() -> [&'static str; 3] {
    [PRAVO_ID, GOVERNMENT_ID, CONSULTANT_ID]
}
