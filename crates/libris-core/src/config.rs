//! Configuration for the libris client
//!
//! Settings come from, lowest precedence first: built-in defaults,
//! `~/.libris/config.toml`, an explicit config file, then the
//! `LIBRIS_API_BASE` environment variable. Command-line flags are applied on
//! top by the front end.
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8080/api/v1"
//! timeout_secs = 30
//!
//! [view]
//! history_limit = 10
//! ranking_limit = 5
//!
//! [sync]
//! reconcile = "local"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::DEFAULT_HISTORY_LIMIT;
use crate::projection::DEFAULT_RANKING_LIMIT;

/// Environment variable that overrides `api.base_url`
pub const API_BASE_ENV: &str = "LIBRIS_API_BASE";

/// Default catalog API root
pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api/v1";

/// Client-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrisConfig {
    /// Catalog API connection settings
    pub api: ApiConfig,
    /// Display limits
    pub view: ViewConfig,
    /// How local state follows server mutations
    pub sync: SyncConfig,
}

/// Catalog API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API root, e.g. `http://localhost:8080/api/v1`
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
            user_agent: format!("libris/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Display limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Transactions shown in the history panel
    pub history_limit: usize,
    /// Entries in the most-borrowed / most-active rankings
    pub ranking_limit: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            ranking_limit: DEFAULT_RANKING_LIMIT,
        }
    }
}

/// How local state follows server mutations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub reconcile: ReconcileMode,
}

/// What to do with the catalog after the server accepts a change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Apply the change to the local catalog; reload only if it disagrees
    #[default]
    Local,
    /// Always reload books and users from the server
    Refetch,
}

impl LibrisConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read a TOML config file
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Location of the per-user config file (`~/.libris/config.toml`)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".libris").join("config.toml"))
    }

    /// Resolve configuration from the standard locations
    ///
    /// An explicit path must exist; the per-user file is optional.
    pub fn load_standard(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::user_config_path() {
            Some(path) if path.is_file() => {
                tracing::debug!("Loading config from {:?}", path);
                Self::load_file(&path)?
            }
            _ => Self::default(),
        };

        if let Some(path) = explicit {
            tracing::debug!("Loading config from {:?}", path);
            config = Self::load_file(path)?;
        }

        config = config.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup(API_BASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = base.trim().to_string();
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.api.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.api.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "api.timeout_secs must be positive".to_string(),
            ));
        }

        if self.view.history_limit == 0 || self.view.ranking_limit == 0 {
            return Err(ConfigError::OutOfRange(
                "view limits must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration loading or validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),
}
