use std::env::VarError;

use tracing_subscriber::EnvFilter;

use crate::{ConfigError, LoggingSettings};

/// Installs the global subscriber. `RUST_LOG` wins over `logging.level`.
pub fn init_tracing(logging: &LoggingSettings) -> Result<(), ConfigError> {
    let filter = build_filter(std::env::var(EnvFilter::DEFAULT_ENV), &logging.level)?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| ConfigError::Telemetry(e.to_string()))
}

/// Only an unset `RUST_LOG` falls back to the configured level.
fn build_filter(rust_log: Result<String, VarError>, level: &str) -> Result<EnvFilter, ConfigError> {
    match rust_log {
        Ok(directives) => EnvFilter::try_new(&directives)
            .map_err(|e| ConfigError::Invalid(format!("{}: {e}", EnvFilter::DEFAULT_ENV))),
        Err(VarError::NotPresent) => EnvFilter::try_new(level)
            .map_err(|e| ConfigError::Invalid(format!("logging.level: {e}"))),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::Invalid(format!(
            "{} is not valid unicode",
            EnvFilter::DEFAULT_ENV
        ))),
    }
}
