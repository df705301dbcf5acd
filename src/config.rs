//! Configuration
//!
//! Settings are read from a TOML file. Every section and key is optional;
//! missing values fall back to the defaults below.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but cannot be read
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for our schema
    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// No data directory could be determined for this platform
    #[error("Failed to determine data directory location")]
    DataDirectoryNotFound,
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub rulesets: RulesetConfig,
    pub metadata: MetadataConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the MediathekViewWeb instance
    pub base_url: String,
    /// Maximum number of hits requested per query
    pub max_results: usize,
    /// Per-request HTTP timeout
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesetConfig {
    /// Where curated rule sets are fetched from; none means generated only
    pub curated_url: Option<String>,
    /// Interval of the background refresh; 0 disables it
    pub refresh_interval_secs: u64,
    /// File holding generated rule sets; defaults to the data directory
    pub generated_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub tvmaze_base_url: String,
    /// Freshness window of cached TVMaze metadata
    pub tvmaze_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Fuzzy title threshold for rule sets that do not set their own (1.0 disables fuzzy matching)
    pub default_title_threshold: f64,
    /// Overall time budget for a single lookup
    pub request_timeout_secs: u64,
    /// Number of catalog hits the generator inspects
    pub generator_sample_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mediathekviewweb.de".to_string(),
            max_results: 1000,
            http_timeout_secs: 30,
        }
    }
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            curated_url: None,
            refresh_interval_secs: 60 * 60,
            generated_path: None,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            tvmaze_base_url: "https://api.tvmaze.com".to_string(),
            tvmaze_cache_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            default_title_threshold: 1.0,
            request_timeout_secs: 60,
            generator_sample_size: 15,
        }
    }
}

impl Config {
    /// Loads the configuration from `path`, or returns defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Platform default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Location of the generated rule set file
    pub fn generated_rulesets_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.rulesets.generated_path {
            return Ok(path.clone());
        }

        let dirs = project_dirs().ok_or(ConfigError::DataDirectoryNotFound)?;
        Ok(dirs.data_dir().join("generated_rulesets.json"))
    }

    /// Interval for long-running callers of `RulesetStore::spawn_refresh`
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.rulesets.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.matching.request_timeout_secs)
    }
}

/// Platform directories for this application
pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("de", "westhoffswelt", "mediathekmatcher")
}
