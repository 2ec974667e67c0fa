//! Storage variants that exist in configuration but have no transport yet.
//!
//! Both succeed at `init` while disabled (so a config that merely mentions
//! them still starts) and refuse everything else.

use crate::error::{ErrorKind, Result};
use crate::remote::{RetrieveRequest, Storage};
use async_trait::async_trait;
use retrosync_storage::File;
use time::UtcDateTime;

macro_rules! stub_storage {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            enabled: bool,
        }

        impl $name {
            pub fn new(enabled: bool) -> Self {
                Self { enabled }
            }
        }

        #[async_trait]
        impl Storage for $name {
            fn name(&self) -> &str {
                $label
            }

            async fn init(&self) -> Result<()> {
                if !self.enabled {
                    return Ok(());
                }
                exn::bail!(ErrorKind::NotImplemented)
            }

            async fn store(&self, _bucket: &str, _file: &File) -> Result<()> {
                exn::bail!(ErrorKind::NotImplemented)
            }

            async fn store_all(&self, _bucket: &str, _files: &[File]) -> Result<()> {
                exn::bail!(ErrorKind::NotImplemented)
            }

            async fn retrieve(&self, _request: RetrieveRequest) -> Result<File> {
                exn::bail!(ErrorKind::NotImplemented)
            }

            async fn last_modified(&self, _bucket: &str, _file: &File) -> Result<Option<UtcDateTime>> {
                exn::bail!(ErrorKind::NotImplemented)
            }
        }
    };
}

stub_storage!(
    /// SFTP storage. Not implemented.
    SftpStorage,
    "sftp"
);
stub_storage!(
    /// Cloud drive storage. Not implemented.
    DriveStorage,
    "drive"
);
