use crate::storage::{ArtifactName, ArtifactStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem-based artifact store
///
/// Output locations from the host may be `file:` URIs or plain paths.
/// Relative paths are taken relative to the configured root.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root_path: PathBuf,
}

impl FilesystemStorage {
    /// Create a new filesystem storage backend with the given root path
    pub fn new<P: AsRef<Path>>(root_path: P) -> StorageResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        if !root_path.exists() {
            std::fs::create_dir_all(&root_path).map_err(|e| {
                StorageError::Config(format!(
                    "Failed to create storage root directory '{}': {}",
                    root_path.display(),
                    e
                ))
            })?;
        }

        // kept verbatim (no canonicalize) so symlinked roots stay as given
        Ok(Self { root_path })
    }
}

fn absolute(path: PathBuf) -> StorageResult<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[async_trait]
impl ArtifactStore for FilesystemStorage {
    fn base_path(&self) -> &Path {
        &self.root_path
    }

    fn resolve_location(&self, location: &str) -> StorageResult<PathBuf> {
        let location = location.trim();
        let dir = if location.is_empty() {
            self.root_path.clone()
        } else if location
            .get(..hosting::FILE_SCHEME.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(hosting::FILE_SCHEME))
        {
            hosting::uri_to_path(location).ok_or_else(|| {
                StorageError::Path(format!("Unusable output location '{}'", location))
            })?
        } else if location.contains("://") {
            return Err(StorageError::Path(format!(
                "Unsupported output protocol in '{}'",
                location
            )));
        } else {
            let path = PathBuf::from(location);
            if path.is_absolute() {
                path
            } else {
                self.root_path.join(path)
            }
        };

        std::fs::create_dir_all(&dir)?;
        absolute(dir)
    }

    async fn store(
        &self,
        location: &str,
        name: &ArtifactName,
        contents: &[u8],
    ) -> StorageResult<PathBuf> {
        let dir = self.resolve_location(location)?;
        let mut file = tempfile::Builder::new()
            .prefix(&name.prefix)
            .suffix(&name.suffix)
            .tempfile_in(&dir)?;
        file.write_all(contents)?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| StorageError::Io(e.error))?;
        debug!("Stored {} bytes at {}", contents.len(), path.display());
        Ok(path)
    }

    async fn remove(&self, path: &Path) -> StorageResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
