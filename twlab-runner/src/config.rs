//! Application configuration loaded from TOML.
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration. The config is an explicit value handed to constructors;
//! nothing here is global.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use twlab_core::data::finmind::DEFAULT_BASE_URL;
use twlab_core::data::{FinMindConfig, StaticDirectory};
use twlab_core::indicators::IndicatorParams;
use twlab_core::scanner::ScanConfig;

use crate::diagnose::DiagnosisConfig;

/// Environment variable that overrides `feed.token`.
pub const TOKEN_ENV: &str = "FINMIND_TOKEN";

/// Content hash of a configuration (hex BLAKE3).
pub type ConfigId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub min_interval_ms: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            min_interval_ms: 1_000,
            max_retries: 3,
            base_delay_ms: 500,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 3_600 }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Optional instrument directory file. When unset the feed's own directory
/// listing is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedSettings,
    pub cache: CacheSettings,
    pub directory: DirectorySettings,
    pub diagnosis: DiagnosisConfig,
    pub indicators: IndicatorParams,
    pub scan: ScanConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Apply `FINMIND_TOKEN` if it is set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        let token = std::env::var(TOKEN_ENV).ok();
        self.with_token_override(token)
    }

    fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            self.feed.token = Some(token);
        }
        self
    }

    /// Check every section. Called once at startup, before any fetch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: twlab_core::AnalysisError| ConfigError::Invalid(e.to_string());

        let url = self.feed.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "feed.base_url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.feed.timeout_secs == 0 {
            return Err(ConfigError::Invalid("feed.timeout_secs must be > 0".into()));
        }
        self.diagnosis.validate().map_err(invalid)?;
        self.indicators.validate().map_err(invalid)?;
        self.scan.validate().map_err(invalid)?;
        Ok(())
    }

    /// Load the directory file named in `[directory] path`, if any.
    pub fn load_directory(&self) -> Result<Option<StaticDirectory>, ConfigError> {
        let Some(path) = &self.directory.path else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let directory = StaticDirectory::from_toml(&content)
            .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))?;
        if directory.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{}: directory lists no instruments",
                path.display()
            )));
        }
        Ok(Some(directory))
    }

    pub fn finmind_config(&self) -> FinMindConfig {
        FinMindConfig {
            base_url: self.feed.base_url.trim().to_string(),
            token: self.feed.token.clone(),
            min_interval: Duration::from_millis(self.feed.min_interval_ms),
            max_retries: self.feed.max_retries,
            base_delay: Duration::from_millis(self.feed.base_delay_ms),
            timeout: Duration::from_secs(self.feed.timeout_secs),
        }
    }

    /// Deterministic hash of the analysis-relevant sections.
    ///
    /// The token is excluded so the id can be logged.
    pub fn config_id(&self) -> Result<ConfigId, ConfigError> {
        let json = serde_json::to_string(&(&self.diagnosis, &self.indicators, &self.scan))
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
