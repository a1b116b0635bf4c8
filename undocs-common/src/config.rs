//! Bootstrap configuration and data folder resolution
//!
//! Settings come from an optional `undocs.toml` in the config directory.
//! A missing file is not an error: built-in defaults are used and a warning
//! is logged. A file that exists but does not parse is fatal.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the bootstrap config inside the config directory
pub const CONFIG_FILE_NAME: &str = "undocs.toml";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "UNDOCS_DATA_DIR";

pub const DEFAULT_DOCUMENTS_URL: &str = "https://documents.un.org/api/symbol/access";
pub const DEFAULT_METADATA_URL: &str = "https://digitallibrary.un.org/search";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Where PDFs, `state.json` and `documents.json` live
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub lineage: LineageConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Discovery (symbol probing) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Consecutive missed sequence numbers that end a series
    #[serde(default = "default_max_consecutive_misses")]
    pub max_consecutive_misses: u32,

    /// Language code passed to the document repository
    #[serde(default = "default_language")]
    pub language: String,

    /// Write sync state after every pattern instead of once per run
    #[serde(default)]
    pub commit_each_pattern: bool,

    #[serde(default = "default_documents_url")]
    pub documents_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_consecutive_misses: default_max_consecutive_misses(),
            language: default_language(),
            commit_each_pattern: false,
            documents_url: default_documents_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Lineage resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Query the bibliographic service (Pass 0)
    #[serde(default = "default_true")]
    pub use_metadata: bool,

    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,

    /// Minimum interval between metadata requests
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Enables the title-similarity pass when set (0.0-1.0)
    #[serde(default)]
    pub title_similarity_threshold: Option<f64>,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            use_metadata: true,
            metadata_url: default_metadata_url(),
            rate_limit_ms: default_rate_limit_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            title_similarity_threshold: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_consecutive_misses() -> u32 {
    3
}

fn default_language() -> String {
    "en".to_string()
}

fn default_documents_url() -> String {
    DEFAULT_DOCUMENTS_URL.to_string()
}

fn default_metadata_url() -> String {
    DEFAULT_METADATA_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl TomlConfig {
    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.discovery.max_consecutive_misses == 0 {
            return Err(Error::Config(
                "discovery.max_consecutive_misses must be at least 1".to_string(),
            ));
        }
        if self.discovery.language.trim().is_empty() {
            return Err(Error::Config("discovery.language must not be empty".to_string()));
        }
        if let Some(threshold) = self.lineage.title_similarity_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(Error::Config(format!(
                    "lineage.title_similarity_threshold must be within 0.0-1.0, got {}",
                    threshold
                )));
            }
        }
        Ok(())
    }
}

/// Load `undocs.toml` from `config_dir`.
///
/// Missing file → defaults with a warning. Unreadable or invalid file → error.
pub fn load_toml_config(config_dir: &Path) -> Result<TomlConfig> {
    let path = config_dir.join(CONFIG_FILE_NAME);

    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve the data directory.
///
/// Priority: command-line argument, `UNDOCS_DATA_DIR`, TOML `data_dir`,
/// then `./data`.
pub fn resolve_data_dir(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.data_dir {
        return path.clone();
    }

    PathBuf::from("./data")
}
