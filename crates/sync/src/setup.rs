//! Building a [`Syncer`] from configuration.

use crate::engine::Syncer;
use crate::error::{ErrorKind, Result};
use crate::remote::{DriveStorage, ObjectStore, SftpStorage, StorageHandle};
use exn::ResultExt;
#[cfg(feature = "s3")]
use retrosync_config::S3Config;
use retrosync_config::{Backend, Config, IndexConfig};
use retrosync_index::{Database, MetadataIndex};
use retrosync_storage::backend::LocalBackend;
use retrosync_storage::{BackendHandle, FileKind};
use std::sync::Arc;

impl Syncer {
    /// Wire up the configured backend, its index and the enabled kinds.
    ///
    /// Opens the index database but does not touch the remote; call
    /// [`init`](Syncer::init) before the first pass.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let storage = storage_from_config(config).await?;
        Ok(Self::new(storage, &config.roms_folder, kinds_from_config(config)))
    }
}

/// Kinds enabled in the `sync` section, in pass order.
pub fn kinds_from_config(config: &Config) -> Vec<FileKind> {
    let mut kinds = Vec::with_capacity(3);
    if config.sync.roms {
        kinds.push(FileKind::Rom);
    }
    if config.sync.saves {
        kinds.push(FileKind::Save);
    }
    if config.sync.states {
        kinds.push(FileKind::State);
    }
    kinds
}

/// The storage variant for the single enabled backend.
pub async fn storage_from_config(config: &Config) -> Result<StorageHandle> {
    let selected = config.storage.selected().or_raise(|| ErrorKind::Config("storage selection"))?;
    let storage: StorageHandle = match selected {
        #[cfg(feature = "s3")]
        Backend::S3(s3) => {
            let store =
                ObjectStore::new(s3_backend(s3)?, &config.owner).with_create_missing(s3.create_missing_resources);
            Arc::new(with_index(store, &s3.index, &config.owner).await?)
        },
        #[cfg(not(feature = "s3"))]
        Backend::S3(_) => exn::bail!(ErrorKind::Config("built without S3 support")),
        Backend::Local(local) => {
            let backend: BackendHandle =
                Arc::new(LocalBackend::new("local", &local.path).or_raise(|| ErrorKind::Config("storage.local.path"))?);
            let store = ObjectStore::new(backend, &config.owner).with_create_missing(local.create_missing_resources);
            Arc::new(with_index(store, &local.index, &config.owner).await?)
        },
        Backend::Sftp(sftp) => Arc::new(SftpStorage::new(sftp.enabled)),
        Backend::Drive(drive) => Arc::new(DriveStorage::new(drive.enabled)),
    };
    tracing::debug!(storage = %storage.name(), "Selected storage backend");
    Ok(storage)
}

#[cfg(feature = "s3")]
fn s3_backend(s3: &S3Config) -> Result<BackendHandle> {
    use retrosync_storage::backend::S3Backend;
    let Some(key_id) = s3.key_id.as_deref() else {
        exn::bail!(ErrorKind::Config("storage.s3.key_id"));
    };
    let Some(key_secret) = s3.key_secret.as_deref() else {
        exn::bail!(ErrorKind::Config("storage.s3.key_secret"));
    };
    Ok(Arc::new(S3Backend::new("s3", &s3.bucket, &s3.region, s3.endpoint.as_deref(), key_id, key_secret)))
}

async fn with_index(store: ObjectStore, config: &IndexConfig, owner: &str) -> Result<ObjectStore> {
    if !config.enabled {
        return Ok(store);
    }
    let db = Database::connect(config.database_path()).await.or_raise(|| ErrorKind::Index)?;
    let index = MetadataIndex::new(&db, &config.table, owner, config.create_missing_resources)
        .or_raise(|| ErrorKind::Config("index table"))?;
    Ok(store.with_index(index))
}
