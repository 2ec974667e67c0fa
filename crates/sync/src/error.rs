//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a sync failure.
///
/// ### Operational Errors
/// - [`ErrorKind::NotImplemented`]
/// - [`ErrorKind::ContainerMissing`]
/// - [`ErrorKind::Lookup`], [`ErrorKind::Upload`] and [`ErrorKind::Download`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Index`]
/// - [`ErrorKind::LocalFile`]
/// - [`ErrorKind::Scan`]
/// - [`ErrorKind::Config`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A disabled or stub backend was asked to do real I/O.
    #[display("not implemented")]
    NotImplemented,
    /// The remote container is absent and creating it was not permitted.
    #[display("container does not exist: {_0}")]
    ContainerMissing(#[error(not(source))] String),
    /// An object backend operation failed.
    #[display("storage backend error")]
    Storage,
    /// A metadata index operation failed.
    #[display("metadata index error")]
    Index,
    /// Reading or writing a file under the sync root failed.
    #[display("local file error: {}", _0.display())]
    LocalFile(#[error(not(source))] PathBuf),
    /// Scanning the sync root failed.
    #[display("could not scan sync root")]
    Scan,
    /// Asking the remote for a file's last upload time failed.
    #[display("lookup failed: {}", _0.display())]
    Lookup(#[error(not(source))] PathBuf),
    /// Uploading one file failed; the rest of the pass was abandoned.
    #[display("upload failed: {}", _0.display())]
    Upload(#[error(not(source))] PathBuf),
    /// Downloading one file failed; the rest of the pass was abandoned.
    #[display("download failed: {}", _0.display())]
    Download(#[error(not(source))] PathBuf),
    /// The configuration could not be turned into a storage backend.
    #[display("invalid configuration: {_0}")]
    Config(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Index | Self::Lookup(_) | Self::Upload(_) | Self::Download(_))
    }
}
