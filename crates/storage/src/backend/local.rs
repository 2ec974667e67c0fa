//! Local filesystem object backend.
//!
//! The configured directory is the container; object keys map onto relative
//! paths underneath it. Useful for syncing to a mounted network share.

use crate::backend::ObjectBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::fs;

/// Local filesystem object backend.
///
/// # Examples
///
/// ```no_run
/// use retrosync_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("nas", "/mnt/nas/retrosync")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    /// Container directory
    root: PathBuf,
    container: String,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// The directory is not created here; that is the job of
    /// [`create_container()`](ObjectBackend::create_container), and only when
    /// creating missing resources is permitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        let container = root.display().to_string();
        Ok(Self { name: name.into(), root, container })
    }

    /// Get the absolute path for an object key.
    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        let validated = validate_path(key)?;
        Ok(self.root.join(validated))
    }
}

#[async_trait]
impl ObjectBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn container(&self) -> &str {
        &self.container
    }

    async fn container_exists(&self) -> Result<bool> {
        match fs::metadata(&self.root).await {
            Ok(metadata) if metadata.is_dir() => Ok(true),
            Ok(_) => exn::bail!(ErrorKind::InvalidPath(self.root.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => exn::bail!(ErrorKind::from_io(e, &self.root)),
        }
    }

    async fn create_container(&self) -> Result<()> {
        tracing::info!(backend = %self.name, directory = %self.root.display(), "Creating container directory");
        Ok(fs::create_dir_all(&self.root).await.map_err(|e| ErrorKind::from_io(e, &self.root))?)
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        // Keep behaviour consistent with S3-compatible storage.
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ErrorKind::from_io(e, parent))?;
        }
        Ok(fs::write(&abs_path, data).await.map_err(|e| ErrorKind::from_io(e, key))?)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::read(&abs_path).await.map_err(|e| ErrorKind::from_io(e, key))?)
    }

    async fn head(&self, key: &str) -> Result<Option<UtcDateTime>> {
        let abs_path = self.absolute_path(key)?;
        let metadata = match fs::metadata(&abs_path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => exn::bail!(ErrorKind::from_io(e, key)),
        };
        let modified = metadata.modified().map_err(|e| ErrorKind::from_io(e, key))?;
        Ok(Some(modified.into()))
    }
}
