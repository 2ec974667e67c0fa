pub mod backend;
pub mod catalog;
pub mod error;
pub mod file;
pub mod identity;
mod path;

pub use crate::backend::ObjectBackend;
pub use crate::catalog::Catalog;
pub use crate::file::{File, FileKind};
pub use crate::identity::Identity;
pub use crate::path::{object_key, split_bucket, validate as validate_path, validate_key};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn ObjectBackend + Send + Sync>;
