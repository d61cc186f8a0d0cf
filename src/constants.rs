//! Core Constants
//!
//! Centralized defaults for paging, windowing, scoring and retries.

/// Application identifiers for platform directories
pub const APP_QUALIFIER: &str = "com";
pub const APP_ORGANIZATION: &str = "dealflow";
pub const APP_NAME: &str = "dealflow";

/// Config file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "dealflow.toml";

/// Log file prefix inside the platform data directory
pub const LOG_FILE_PREFIX: &str = "dealflow.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Paging defaults
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_STALE_TIME_SECS: u64 = 300;
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Windowing defaults (row height in pixels, trailing overscan in rows)
pub const DEFAULT_ITEM_EXTENT: f64 = 40.0;
pub const DEFAULT_OVERSCAN: usize = 1;

/// Scoring weights (must sum to 1.0)
pub const WEIGHT_SECTOR: f64 = 0.25;
pub const WEIGHT_CAPACITY: f64 = 0.25;
pub const WEIGHT_URGENCY: f64 = 0.20;
pub const WEIGHT_STRATEGIC_FIT: f64 = 0.30;
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Score label thresholds (inclusive lower bounds)
pub const SCORE_EXCELLENT_MIN: u8 = 76;
pub const SCORE_GOOD_MIN: u8 = 51;
pub const SCORE_MEDIUM_MIN: u8 = 26;

/// Retry configuration for the remote source wrapper
pub const RETRY_MAX_ATTEMPTS: u32 = 3;
pub const RETRY_INITIAL_DELAY_MS: u64 = 250;
pub const RETRY_MAX_DELAY_MS: u64 = 5000;
pub const RETRY_MULTIPLIER: f64 = 2.0;
pub const RETRY_JITTER: f64 = 0.1;

/// Per-attempt fetch timeout
pub const FETCH_TIMEOUT_MS: u64 = 15_000;
