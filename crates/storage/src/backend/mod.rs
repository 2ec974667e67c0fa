//! Object backend trait and implementations.
//!
//! An object backend is a flat key/value store of whole objects living inside
//! a single container (an S3 bucket, a local directory). Keys are
//! `/`-separated and are validated with [`validate_key`](crate::validate_key)
//! before use.

mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use async_trait::async_trait;
use time::UtcDateTime;

/// Unified interface for object backends.
///
/// # Examples
///
/// ```
/// use retrosync_storage::{backend::ObjectBackend, error::Result};
///
/// async fn copy_object(backend: &dyn ObjectBackend, from: &str, to: &str) -> Result<()> {
///     let data = backend.get(from).await?;
///     backend.put(to, &data).await
/// }
/// ```
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Name of the container objects are stored in (bucket name, directory).
    fn container(&self) -> &str;

    /// Whether the container exists and is accessible.
    ///
    /// Absence is `Ok(false)`; anything else that stops the check from
    /// completing (credentials, network) is an error.
    async fn container_exists(&self) -> Result<bool>;

    /// Create the container.
    async fn create_container(&self) -> Result<()>;

    /// Upload an object in full, overwriting any object under the same key.
    ///
    /// # Notes
    /// - Implementations should create intermediate "directories" as needed.
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Download an object in full.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if no object
    /// exists under the key.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Last-modified time of an object, or `None` if it does not exist.
    ///
    /// ```no_run
    /// # use retrosync_storage::{backend::ObjectBackend, error::Result};
    /// # async fn example(backend: &dyn ObjectBackend) -> Result<()> {
    /// match backend.head("2024/01/17/12/pi/gba/x.sav").await? {
    ///     Some(modified) => println!("last uploaded at {modified}"),
    ///     None => println!("never uploaded"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn head(&self, key: &str) -> Result<Option<UtcDateTime>>;

    /// Check if an object exists.
    ///
    /// Default implementation is a [`head()`](Self::head) that discards the
    /// timestamp.
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.head(key).await?.is_some())
    }
}
