#[cfg(test)]
mod tests;
mod logging_config;
pub mod config;

pub use config::{AppConfig, Config, ConfigError, LocalConfig};
pub use logging_config::LoggingConfig;
