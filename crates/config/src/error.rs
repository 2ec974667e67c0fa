//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// One of the layered providers (file, environment) could not be merged
    /// into a [`Config`](crate::Config).
    #[display("could not load configuration")]
    Load,
    /// The owner is still the placeholder written by `config example`.
    #[display("owner must be changed from the example default")]
    DefaultOwner,
    #[display("invalid owner: {_0}")]
    InvalidOwner(#[error(not(source))] String),
    #[display("no storage backend enabled")]
    NoBackend,
    #[display("more than one storage backend enabled: {_0}")]
    MultipleBackends(#[error(not(source))] String),
    /// A field required by an enabled backend is empty.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    #[display("could not write example configuration: {}", _0.display())]
    Example(#[error(not(source))] PathBuf),
}
