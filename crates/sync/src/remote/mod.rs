//! The storage capability the reconciliation engine talks to.
//!
//! A [`Storage`] knows how to put a local file somewhere remote, get it back,
//! and say when it was last put there. [`ObjectStore`] is the real
//! implementation (object backend plus optional metadata index); the SFTP and
//! cloud drive variants are stubs.

mod object;
mod stub;

pub use self::object::ObjectStore;
pub use self::stub::{DriveStorage, SftpStorage};
use crate::error::Result;
use async_trait::async_trait;
use retrosync_storage::File;
use std::path::PathBuf;
use std::sync::Arc;
use time::UtcDateTime;

pub type StorageHandle = Arc<dyn Storage + Send + Sync>;

/// A file to fetch, and where to put it.
///
/// The logical directory of `to_retrieve` is bucket-qualified: its last
/// `/`-separated segment is the file's logical directory and everything
/// before it is the time bucket (e.g. `2024/01/17/12/gba`).
#[derive(Debug, Clone)]
pub struct RetrieveRequest {
    pub to_retrieve: File,
    pub destination: PathBuf,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Name of the storage variant, for logging.
    fn name(&self) -> &str;

    /// Validate (and, where permitted, create) remote resources.
    async fn init(&self) -> Result<()>;

    /// Upload one file into the given time bucket.
    async fn store(&self, bucket: &str, file: &File) -> Result<()>;

    /// Upload files one after another, stopping at the first failure.
    async fn store_all(&self, bucket: &str, files: &[File]) -> Result<()> {
        for file in files {
            self.store(bucket, file).await?;
        }
        Ok(())
    }

    /// Download a file, returning a record of the written local copy.
    async fn retrieve(&self, request: RetrieveRequest) -> Result<File>;

    /// When the file was last stored, or `None` if it never was.
    async fn last_modified(&self, bucket: &str, file: &File) -> Result<Option<UtcDateTime>>;
}
