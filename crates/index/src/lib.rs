//! Metadata index for synced files.
//!
//! The index maps a file identity (`owner#dir#normalized-name`) to the object
//! key of its most recent upload, so a file can be found without rebuilding
//! its key from the time bucket it was uploaded in. It is a derived view of
//! the object store: deleting the database loses nothing but the shortcut.

mod db;
pub mod error;
mod index;
pub mod models;

pub use crate::db::Database;
pub use crate::index::MetadataIndex;
pub use crate::models::MetadataRecord;
