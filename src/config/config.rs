use std::path::{Path, PathBuf};

use hosting::{HostingConfig, HostingError, Rect};
use serde::Deserialize;
use thiserror::Error;

use crate::config::LoggingConfig;
use crate::storage::StorageConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Application id cannot be empty")]
    InvalidAppId,

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("Logging to file requires log_file_path")]
    MissingLogFilePath,

    #[error("Invalid hosting configuration: {0}")]
    Hosting(#[from] HostingError),

    #[error("Invalid storage configuration: {0}")]
    Storage(String),
}

/// Top-level configuration, read from a TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub hosting: HostingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub local: LocalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_id")]
    pub id: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Settings for running the application against a local directory host
#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    /// Directory scanned for DICOM files offered as available data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory the host hands out as output location
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Screen area the host grants, if it overrides the preferred one
    #[serde(default)]
    pub screen: Option<Rect>,
    /// Load and display the first patient's data after it becomes available
    #[serde(default = "default_true")]
    pub load_data: bool,
    /// Create and publish a secondary capture of the displayed image
    #[serde(default)]
    pub secondary_capture: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            id: default_app_id(),
            log_level: default_log_level(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            screen: None,
            load_data: true,
            secondary_capture: false,
        }
    }
}

impl Config {
    /// Read and validate a configuration file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.id.trim().is_empty() {
            return Err(ConfigError::InvalidAppId);
        }
        if self.app.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidLogLevel(self.app.log_level.clone()));
        }
        if self.logging.log_to_file && self.logging.log_file_path.trim().is_empty() {
            return Err(ConfigError::MissingLogFilePath);
        }
        self.hosting.validate()?;
        self.storage
            .validate()
            .map_err(|e| ConfigError::Storage(e.to_string()))?;
        Ok(())
    }
}

fn default_app_id() -> String {
    "dah".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./tmp/output")
}

fn default_true() -> bool {
    true
}
