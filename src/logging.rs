use std::fs::File;

use tracing_subscriber::{self, prelude::*, EnvFilter};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to create log file '{path}': {source}")]
    File {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to initialize logging: {0}")]
    Init(String),
}

/// Filter from `RUST_LOG`, falling back to the configured level
fn filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.app.log_level))
}

/// Install the global subscriber
pub fn init(config: &Config) -> Result<(), LoggingError> {
    if config.logging.log_to_file {
        let path = &config.logging.log_file_path;
        let file = File::create(path).map_err(|source| LoggingError::File {
            path: path.clone(),
            source,
        })?;
        let file_appender = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(file);
        let stdout_appender = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(filter(config))
            .with(file_appender)
            .with(stdout_appender)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))
    } else {
        let stdout_appender = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(filter(config))
            .with(stdout_appender)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))
    }
}
