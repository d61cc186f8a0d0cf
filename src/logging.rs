//! Logging Setup
//!
//! Installs the global `tracing` subscriber: human-readable output on stderr
//! and, when enabled in the config, a daily rolling file in the data
//! directory. `RUST_LOG` overrides the configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::constants::LOG_FILE_PREFIX;
use crate::domain::config::LogConfig;
use crate::error::{Error, Result};
use crate::helpers::{get_or_create_data_dir, is_development};

/// Initialize logging
///
/// Keep the returned guard alive until exit; dropping it flushes and closes
/// the log file.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env.as_deref(), &config.level)?;

    let (file_layer, guard) = if config.file {
        let dir = get_or_create_data_dir()?;
        let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(is_development())
        .with_line_number(is_development());

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Invalid {
            message: format!("Logging already initialized: {e}"),
        })?;

    tracing::debug!(level = %config.level, file = config.file, "Logging initialized");
    Ok(guard)
}

/// Filter from the `RUST_LOG` value if set and valid, else from the config
pub fn build_filter(env: Option<&str>, default_directives: &str) -> Result<EnvFilter> {
    if let Some(env) = env.filter(|v| !v.trim().is_empty()) {
        match EnvFilter::try_new(env) {
            Ok(filter) => return Ok(filter),
            Err(e) => eprintln!("Ignoring invalid RUST_LOG '{env}': {e}"),
        }
    }
    EnvFilter::try_new(default_directives).map_err(|e| Error::Invalid {
        message: format!("Invalid log level '{default_directives}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_config() {
        let filter = build_filter(Some("dealflow=trace"), "info").expect("filter");
        assert_eq!(filter.to_string(), "dealflow=trace");
    }

    #[test]
    fn test_config_level_used_without_env() {
        let filter = build_filter(None, "warn").expect("filter");
        assert_eq!(filter.to_string(), "warn");
        let filter = build_filter(Some("  "), "debug").expect("filter");
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn test_invalid_config_level() {
        assert!(matches!(
            build_filter(None, "dealflow=loud"),
            Err(Error::Invalid { .. })
        ));
    }
}
