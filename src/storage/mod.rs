use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub mod filesystem;

pub use filesystem::FilesystemStorage;

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Path error: {0}")]
    Path(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// File name pattern for a stored artifact: `<prefix><random><suffix>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub prefix: String,
    pub suffix: String,
}

impl ArtifactName {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }
}

/// Durable store for artifacts produced by the application
///
/// The host decides where output goes; the store only turns that location
/// into a directory and writes uniquely named files into it.
#[async_trait]
pub trait ArtifactStore: Send + Sync + std::fmt::Debug {
    /// Root used when the host hands out no location or a relative one
    fn base_path(&self) -> &Path;

    /// Directory for an output location returned by the host
    fn resolve_location(&self, location: &str) -> StorageResult<PathBuf>;

    /// Write `contents` to a new file under `location`, returning its absolute path
    async fn store(
        &self,
        location: &str,
        name: &ArtifactName,
        contents: &[u8],
    ) -> StorageResult<PathBuf>;

    /// Delete a file written by [`ArtifactStore::store`]; a missing file is not an error
    async fn remove(&self, path: &Path) -> StorageResult<()>;
}

/// Configuration for storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub options: std::collections::HashMap<String, serde_json::Value>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mut options = std::collections::HashMap::new();
        options.insert(
            "path".to_string(),
            serde_json::Value::String("./tmp".to_string()),
        );

        Self {
            backend: default_backend(),
            options,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> StorageResult<()> {
        match self.backend.as_str() {
            "filesystem" => Ok(()),
            other => Err(StorageError::Config(format!(
                "Unknown storage backend: {}",
                other
            ))),
        }
    }

    fn path(&self) -> &str {
        self.options
            .get("path")
            .and_then(|v| v.as_str())
            .unwrap_or("./tmp")
    }
}

fn default_backend() -> String {
    "filesystem".to_string()
}

/// Create a storage backend from configuration
pub fn create_storage_backend(config: &StorageConfig) -> StorageResult<Arc<dyn ArtifactStore>> {
    config.validate()?;
    match config.backend.as_str() {
        "filesystem" => {
            let storage = FilesystemStorage::new(config.path())?;
            Ok(Arc::new(storage))
        }
        _ => Err(StorageError::Config(format!(
            "Unknown storage backend: {}",
            config.backend
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_backend_is_rejected() {
        let config = StorageConfig {
            backend: "s3".to_string(),
            options: Default::default(),
        };
        assert!(config.validate().is_err());
        assert!(create_storage_backend(&config).is_err());
    }

    #[test]
    fn test_default_path() {
        assert_eq!(StorageConfig::default().path(), "./tmp");
    }
}
