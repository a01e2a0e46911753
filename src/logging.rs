use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, LoggingSettings};

/// Numeric verbosity (0..=6) to an `EnvFilter` directive.
pub fn level_filter(level: u8) -> &'static str {
    match level {
        0..=2 => "error",
        3 => "warn",
        4 => "info",
        5 => "debug",
        _ => "trace",
    }
}

/// `RUST_LOG` wins over the configured level when set.
pub fn init(settings: &LoggingSettings) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_filter(settings.level)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match &settings.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| ConfigError::LogFile { path: path.clone(), source })?;
            builder.with_ansi(false).with_writer(Arc::new(file)).try_init().ok();
        }
        None => {
            builder.with_writer(std::io::stderr).try_init().ok();
        }
    }
    Ok(())
}
