//! Ingestor configuration: TOML parsing, defaults and validation.
//!
//! Every key has a default, so an empty file (or [`IngestorConfig::default`])
//! is a working configuration. Unknown keys are rejected to catch typos.
//!
//! ```toml
//! [polygon]
//! base_url = "https://api.polygon.io"
//! api_key_env = "POLYGON_API_KEY"
//! requests_per_minute = 5
//! max_retries = 3
//! base_delay_ms = 1000
//! timeout_secs = 30
//! adjusted = true
//! agg_period_minutes = 1
//!
//! [pagination]
//! page_limit = 50000
//!
//! [scheduler]
//! reserved_workers = 2
//! # max_workers = 4
//! failure_policy = "partial"
//!
//! [calendar]
//! rules = "federal"
//! extra_closures = ["2025-01-09"]
//! ```
//!
//! The API key itself never lives in the file; `api_key_env` names the
//! environment variable it is read from.

use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::HolidayRules;
use crate::models::page::PageLimit;
use crate::requests::historical::{FailurePolicy, WorkerPool};

/// Errors related to loading the ingestor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct IngestorConfig {
    pub polygon: PolygonConfig,
    pub pagination: PaginationConfig,
    pub scheduler: SchedulerConfig,
    pub calendar: CalendarConfig,
}

/// Remote access settings for the Polygon REST provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct PolygonConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Client-side throttle shared by every in-flight work unit.
    pub requests_per_minute: NonZeroU32,
    /// Retries for transient failures (network, 429, 5xx). Zero disables retrying.
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
    /// Split-adjusted minute aggregates.
    pub adjusted: bool,
    /// Width of each aggregate bar, in minutes.
    pub agg_period_minutes: NonZeroU32,
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.polygon.io".to_string(),
            api_key_env: "POLYGON_API_KEY".to_string(),
            requests_per_minute: nonzero!(5u32),
            max_retries: 3,
            base_delay_ms: 1000,
            timeout_secs: 30,
            adjusted: true,
            agg_period_minutes: nonzero!(1u32),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct PaginationConfig {
    pub page_limit: PageLimit,
}

/// Worker pool sizing and failure handling for the day fan-out.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct SchedulerConfig {
    /// Execution units left to the host when sizing the pool.
    pub reserved_workers: usize,
    /// Fixed pool size; overrides `reserved_workers` when set.
    pub max_workers: Option<NonZeroUsize>,
    pub failure_policy: FailurePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reserved_workers: WorkerPool::DEFAULT_RESERVED,
            max_workers: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn worker_pool(&self) -> WorkerPool {
        match self.max_workers {
            Some(capacity) => WorkerPool::with_capacity(capacity),
            None => WorkerPool::from_host(self.reserved_workers),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct CalendarConfig {
    pub rules: HolidayRules,
    /// One-off closures on top of the rule set.
    pub extra_closures: Vec<NaiveDate>,
}

impl IngestorConfig {
    /// Checks the values serde cannot express as types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let polygon = &self.polygon;
        if !(polygon.base_url.starts_with("http://") || polygon.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "polygon.base_url must be an http(s) URL, got '{}'",
                polygon.base_url
            )));
        }
        if polygon.api_key_env.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "polygon.api_key_env cannot be empty".to_string(),
            ));
        }
        if polygon.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "polygon.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate a configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> Result<IngestorConfig, ConfigError> {
    let config: IngestorConfig = toml::from_str(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// Read a TOML file from disk, parse and validate it.
pub fn load_config_path(path: impl AsRef<Path>) -> Result<IngestorConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_str(&text)
}
