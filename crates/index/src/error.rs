//! Index Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An index error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    /// The index table does not exist and creating it was not permitted.
    #[display("index table does not exist: {_0}")]
    TableMissing(#[error(not(source))] String),
    /// Table names are interpolated into queries, so only plain identifiers
    /// are accepted.
    #[display("invalid index table name: {_0:?}")]
    InvalidTable(#[error(not(source))] String),
    /// A stored row could not be converted back into a record.
    #[display("invalid index data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// The index is disabled; reads have no answer.
    #[display("metadata index is disabled")]
    NotImplemented,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}
