//! Config - Application Configuration
//!
//! Persisted as TOML in the platform config directory. Every table and field
//! is optional in the file; missing values fall back to the defaults in
//! `constants.rs`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_CACHE_CAPACITY, DEFAULT_LOG_LEVEL, DEFAULT_PAGE_SIZE,
    DEFAULT_STALE_TIME_SECS, FETCH_TIMEOUT_MS, RETRY_INITIAL_DELAY_MS, RETRY_JITTER,
    RETRY_MAX_ATTEMPTS, RETRY_MAX_DELAY_MS, RETRY_MULTIPLIER,
};
use crate::domain::score::ScoreWeights;
use crate::domain::window::WindowedList;
use crate::error::{Error, Result};
use crate::helpers::get_or_create_config_dir;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Paging and caching
    pub pagination: PaginationConfig,
    /// Row windowing
    pub window: WindowedList,
    /// Opportunity score weights
    pub scoring: ScoreWeights,
    /// Retry policy of the remote source
    pub retry: RetrySettings,
    /// Log output
    pub logging: LogConfig,
}

/// When to fetch the first page after the criteria change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPolicy {
    /// Wait for the next `load_next_page`
    Lazy,
    /// Fetch page 1 immediately on reset
    #[default]
    Eager,
}

/// Paging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Items per page
    pub page_size: u32,
    /// Seconds before loaded pages are considered stale
    pub stale_time_secs: u64,
    /// Fetch behaviour after a reset
    pub fetch_policy: FetchPolicy,
    /// Maximum cached queries
    pub cache_capacity: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            stale_time_secs: DEFAULT_STALE_TIME_SECS,
            fetch_policy: FetchPolicy::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl PaginationConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }
}

/// Retry policy of the remote source, as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per page, including the first
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// Jitter factor (0.0 - 1.0)
    pub jitter: f64,
    /// Per-attempt timeout
    pub timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            initial_delay_ms: RETRY_INITIAL_DELAY_MS,
            max_delay_ms: RETRY_MAX_DELAY_MS,
            multiplier: RETRY_MULTIPLIER,
            jitter: RETRY_JITTER,
            timeout_ms: FETCH_TIMEOUT_MS,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Also write a daily rolling file in the data directory
    pub file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: false,
        }
    }
}

impl AppConfig {
    /// Load from the platform config directory, creating an empty file if missing
    pub fn load() -> Result<Self> {
        let path = get_or_create_config_dir()?.join(CONFIG_FILE_NAME);
        if !path.exists() {
            std::fs::write(&path, "")?;
        }
        Self::load_from(&path)
    }

    /// Load from a file; an empty or missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        info!(path = ?path, "Loading config file");
        if !path.exists() {
            return Ok(Self::default());
        }

        let value = std::fs::read_to_string(path)?;
        if value.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = toml::from_str(&value).map_err(|e| {
            error!(error = %e, path = ?path, "Failed to parse config file");
            e
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write to a file as pretty TOML
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the list core cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.pagination.page_size == 0 {
            return Err(Error::Invalid {
                message: "pagination.page_size must be at least 1".to_string(),
            });
        }
        if !(self.window.item_extent.is_finite() && self.window.item_extent > 0.0) {
            return Err(Error::Invalid {
                message: format!(
                    "window.item_extent must be positive, got {}",
                    self.window.item_extent
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(Error::Invalid {
                message: format!("retry.jitter must be within 0.0..=1.0, got {}", self.retry.jitter),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Invalid {
                message: "retry.max_attempts must be at least 1".to_string(),
            });
        }
        self.scoring.validate()
    }
}
