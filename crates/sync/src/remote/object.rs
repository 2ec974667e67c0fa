use crate::error::{ErrorKind, Result};
use crate::remote::{RetrieveRequest, Storage};
use async_trait::async_trait;
use exn::ResultExt;
use retrosync_index::MetadataIndex;
use retrosync_storage::{BackendHandle, File, Identity, object_key, split_bucket};
use time::UtcDateTime;
use tokio::fs;

/// Object backend plus an optional metadata index.
///
/// Objects are keyed `{bucket}/{owner}/{dir}/{name}`. When an index is
/// attached, every successful upload is recorded in it, and lookups consult
/// it before falling back to the key layout.
pub struct ObjectStore {
    backend: BackendHandle,
    owner: String,
    enabled: bool,
    create_missing: bool,
    index: Option<MetadataIndex>,
}

impl ObjectStore {
    /// An enabled store with no index that will not create missing
    /// containers.
    pub fn new(backend: BackendHandle, owner: impl Into<String>) -> Self {
        Self { backend, owner: owner.into(), enabled: true, create_missing: false, index: None }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_create_missing(mut self, create_missing: bool) -> Self {
        self.create_missing = create_missing;
        self
    }

    pub fn with_index(mut self, index: MetadataIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn index(&self) -> Option<&MetadataIndex> {
        self.index.as_ref()
    }

    fn key(&self, bucket: &str, file: &File) -> String {
        object_key(bucket, &self.owner, &file.dir, &file.name)
    }

    /// Object key recorded for `identity`, if the index has a usable one.
    ///
    /// No index, no record and an empty location are all `None`; a failing
    /// lookup is an error.
    async fn indexed_location(&self, identity: &Identity) -> Result<Option<String>> {
        let Some(index) = &self.index else {
            return Ok(None);
        };
        let record = index.get(identity).await.or_raise(|| ErrorKind::Index)?;
        Ok(record.map(|record| record.location).filter(|location| !location.is_empty()))
    }
}

#[async_trait]
impl Storage for ObjectStore {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn init(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let container = self.backend.container();
        if !self.backend.container_exists().await.or_raise(|| ErrorKind::Storage)? {
            if !self.create_missing {
                exn::bail!(ErrorKind::ContainerMissing(container.to_string()));
            }
            self.backend.create_container().await.or_raise(|| ErrorKind::Storage)?;
        }
        tracing::info!(backend = %self.backend.name(), container, "Object store ready");
        if let Some(index) = &self.index {
            index.init().await.or_raise(|| ErrorKind::Index)?;
        }
        Ok(())
    }

    async fn store(&self, bucket: &str, file: &File) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let data = fs::read(&file.path).await.or_raise(|| ErrorKind::LocalFile(file.path.clone()))?;
        let key = self.key(bucket, file);
        self.backend.put(&key, &data).await.or_raise(|| ErrorKind::Storage)?;
        tracing::info!(key = %key, size = data.len(), "Uploaded file");
        if let Some(index) = &self.index {
            let identity = Identity::of(&self.owner, file);
            // The object is already stored; a stale index only costs a
            // fallback lookup later.
            if let Err(err) = index.upsert(&identity, &key, file).await {
                tracing::error!(identity = %identity, key = %key, error = ?err, "Failed to store file metadata");
            }
        }
        Ok(())
    }

    async fn retrieve(&self, request: RetrieveRequest) -> Result<File> {
        if !self.enabled {
            exn::bail!(ErrorKind::NotImplemented);
        }
        let RetrieveRequest { to_retrieve, destination } = request;
        let (bucket, dir) = split_bucket(&to_retrieve.dir);
        let identity = Identity::new(&self.owner, dir, &to_retrieve.name);
        let key = match self.indexed_location(&identity).await? {
            Some(location) => location,
            None => object_key(bucket, &self.owner, dir, &to_retrieve.name),
        };
        let data = self.backend.get(&key).await.or_raise(|| ErrorKind::Storage)?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await.or_raise(|| ErrorKind::LocalFile(parent.to_path_buf()))?;
        }
        fs::write(&destination, &data).await.or_raise(|| ErrorKind::LocalFile(destination.clone()))?;
        tracing::info!(key = %key, destination = %destination.display(), size = data.len(), "Downloaded file");
        Ok(File {
            dir: dir.to_string(),
            path: destination,
            name: to_retrieve.name,
            modified: UtcDateTime::now(),
            kind: to_retrieve.kind,
        })
    }

    async fn last_modified(&self, bucket: &str, file: &File) -> Result<Option<UtcDateTime>> {
        if !self.enabled {
            exn::bail!(ErrorKind::NotImplemented);
        }
        if let Some(index) = &self.index {
            match index.get_by_file(file).await {
                Ok(Some(record)) => {
                    if let Some(at) = record.last_modified_at() {
                        return Ok(Some(at));
                    }
                },
                Ok(None) => {},
                Err(err) => tracing::warn!(file = %file.path.display(), error = ?err, "Metadata lookup failed"),
            }
        }
        let key = self.key(bucket, file);
        self.backend.head(&key).await.or_raise(|| ErrorKind::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrosync_index::Database;
    use retrosync_storage::backend::{MockBackend, ObjectBackend};
    use retrosync_storage::FileKind;
    use std::path::Path;
    use std::sync::Arc;
    use time::Duration;

    const BUCKET: &str = "2024/01/17/12";

    fn write_local(root: &Path, dir: &str, name: &str, data: &[u8]) -> File {
        let path = root.join(dir).join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, data).unwrap();
        let modified = std::fs::metadata(&path).unwrap().modified().unwrap().into();
        File::new(dir, path, modified)
    }

    async fn indexed(backend: Arc<MockBackend>) -> ObjectStore {
        let db = Database::connect_in_memory().await.unwrap();
        let index = MetadataIndex::new(&db, "retrosync_files", "u", true).unwrap();
        let store = ObjectStore::new(backend, "u").with_index(index);
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_init_creates_missing_container() {
        let backend = Arc::new(MockBackend::default().without_container());
        let store = ObjectStore::new(backend.clone(), "u").with_create_missing(true);
        store.init().await.unwrap();
        assert!(backend.container_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_init_missing_container_not_permitted() {
        let backend = Arc::new(MockBackend::default().without_container());
        let store = ObjectStore::new(backend, "u");
        let err = store.init().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ContainerMissing(c) if c == "mock-container"));
    }

    #[tokio::test]
    async fn test_init_index_failure_aborts() {
        let db = Database::connect_in_memory().await.unwrap();
        let index = MetadataIndex::new(&db, "retrosync_files", "u", false).unwrap();
        let store = ObjectStore::new(Arc::new(MockBackend::default()), "u").with_index(index);
        let err = store.init().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Index));
    }

    #[tokio::test]
    async fn test_disabled_contract() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::default().without_container());
        let store = ObjectStore::new(backend.clone(), "u").with_enabled(false);
        let file = write_local(temp_dir.path(), "gba", "x.sav", b"data");

        store.init().await.unwrap();
        store.store(BUCKET, &file).await.unwrap();
        store.store_all(BUCKET, std::slice::from_ref(&file)).await.unwrap();
        assert!(backend.keys().await.is_empty());
        assert!(!backend.container_exists().await.unwrap());

        let err = store.last_modified(BUCKET, &file).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotImplemented));
        let request = RetrieveRequest { to_retrieve: file.clone(), destination: file.path.clone() };
        let err = store.retrieve(request).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotImplemented));
    }

    #[tokio::test]
    async fn test_store_key_layout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::default());
        let store = ObjectStore::new(backend.clone(), "u");
        let nested = write_local(temp_dir.path(), "gba", "x.sav", b"nested");
        let root_level = write_local(temp_dir.path(), "", "y.sav", b"root");
        store.store_all(BUCKET, &[nested, root_level]).await.unwrap();
        assert_eq!(backend.keys().await, vec!["2024/01/17/12/u/gba/x.sav", "2024/01/17/12/u/y.sav"]);
        assert_eq!(backend.get("2024/01/17/12/u/gba/x.sav").await.unwrap(), b"nested");
    }

    #[tokio::test]
    async fn test_store_missing_local_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(Arc::new(MockBackend::default()), "u");
        let file = File::new("gba", temp_dir.path().join("gba/gone.sav"), UtcDateTime::now());
        let err = store.store(BUCKET, &file).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::LocalFile(_)));
    }

    #[tokio::test]
    async fn test_store_all_stops_at_first_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::default());
        let store = ObjectStore::new(backend.clone(), "u");
        let first = write_local(temp_dir.path(), "gba", "a.sav", b"a");
        let missing = File::new("gba", temp_dir.path().join("gba/gone.sav"), UtcDateTime::now());
        let last = write_local(temp_dir.path(), "gba", "c.sav", b"c");
        assert!(store.store_all(BUCKET, &[first, missing, last]).await.is_err());
        assert_eq!(backend.keys().await, vec!["2024/01/17/12/u/gba/a.sav"]);
    }

    #[tokio::test]
    async fn test_store_records_metadata() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = indexed(Arc::new(MockBackend::default())).await;
        let file = write_local(temp_dir.path(), "gba", "save.sav", b"data");
        store.store(BUCKET, &file).await.unwrap();

        let record = store.index().unwrap().get_by_file(&file).await.unwrap().unwrap();
        assert_eq!(record.location, "2024/01/17/12/u/gba/save.sav");
        assert_eq!(record.owner, "u");
        assert_eq!(record.kind, FileKind::Save);
        assert_eq!(record.created, record.last_modified);
    }

    #[tokio::test]
    async fn test_store_survives_metadata_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::default());
        let db = Database::connect_in_memory().await.unwrap();
        // Never initialized, so every upsert fails.
        let index = MetadataIndex::new(&db, "retrosync_files", "u", true).unwrap();
        let store = ObjectStore::new(backend.clone(), "u").with_index(index);
        let file = write_local(temp_dir.path(), "gba", "save.sav", b"data");
        store.store(BUCKET, &file).await.unwrap();
        assert_eq!(backend.keys().await, vec!["2024/01/17/12/u/gba/save.sav"]);
    }

    #[tokio::test]
    async fn test_store_backend_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(Arc::new(MockBackend::default().with_failing_puts()), "u");
        let file = write_local(temp_dir.path(), "gba", "save.sav", b"data");
        let err = store.store(BUCKET, &file).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Storage));
    }

    #[tokio::test]
    async fn test_last_modified_round_trip_through_index() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = indexed(Arc::new(MockBackend::default())).await;
        let file = write_local(temp_dir.path(), "gba", "save.sav", b"data");
        let now = UtcDateTime::now();
        // The index keeps millisecond resolution.
        let before = now.replace_nanosecond(now.millisecond() as u32 * 1_000_000).unwrap();
        store.store(BUCKET, &file).await.unwrap();
        let after = UtcDateTime::now();
        let at = store.last_modified(BUCKET, &file).await.unwrap().unwrap();
        assert!(before <= at && at <= after);
    }

    #[tokio::test]
    async fn test_last_modified_round_trip_without_index() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(Arc::new(MockBackend::default()), "u");
        let file = write_local(temp_dir.path(), "gba", "save.sav", b"data");
        let before = UtcDateTime::now();
        store.store(BUCKET, &file).await.unwrap();
        let after = UtcDateTime::now();
        let at = store.last_modified(BUCKET, &file).await.unwrap().unwrap();
        assert!(before <= at && at <= after);
    }

    #[tokio::test]
    async fn test_last_modified_never_stored() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = write_local(temp_dir.path(), "gba", "save.sav", b"data");
        let plain = ObjectStore::new(Arc::new(MockBackend::default()), "u");
        assert_eq!(plain.last_modified(BUCKET, &file).await.unwrap(), None);
        let store = indexed(Arc::new(MockBackend::default())).await;
        assert_eq!(store.last_modified(BUCKET, &file).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_modified_index_failure_falls_back_to_head() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::default());
        let then = UtcDateTime::now() - Duration::hours(1);
        backend.insert_at("2024/01/17/12/u/gba/save.sav", b"data".to_vec(), then).await.unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        let index = MetadataIndex::new(&db, "retrosync_files", "u", true).unwrap();
        let store = ObjectStore::new(backend, "u").with_index(index);
        let file = write_local(temp_dir.path(), "gba", "save.sav", b"data");
        assert_eq!(store.last_modified(BUCKET, &file).await.unwrap(), Some(then));
    }

    #[tokio::test]
    async fn test_retrieve_fallback_key() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::with_objects([("2024/01/17/12/u/gba/x.sav", b"remote")]));
        let store = ObjectStore::new(backend, "u");
        let destination = temp_dir.path().join("restored/gba/download.tmp");
        let requested = File::new("2024/01/17/12/gba", "/unused/x.sav", UtcDateTime::now());
        let before = UtcDateTime::now();

        let file = store.retrieve(RetrieveRequest { to_retrieve: requested, destination: destination.clone() }).await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"remote");
        assert_eq!(file.name, "x.sav");
        assert_eq!(file.dir, "gba");
        assert_eq!(file.path, destination);
        assert_eq!(file.kind, FileKind::Save);
        assert!(file.modified >= before);
    }

    #[tokio::test]
    async fn test_retrieve_prefers_indexed_location() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::default());
        let store = indexed(backend.clone()).await;
        let local = write_local(temp_dir.path(), "gba", "save.sav", b"uploaded an hour ago");
        store.store("2024/01/17/11", &local).await.unwrap();

        // Asking for the current bucket still finds the older upload.
        let requested = File::new("2024/01/17/12/gba", "/unused/save.sav", UtcDateTime::now());
        let destination = temp_dir.path().join("out.sav");
        store.retrieve(RetrieveRequest { to_retrieve: requested, destination: destination.clone() }).await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"uploaded an hour ago");
    }

    #[tokio::test]
    async fn test_retrieve_empty_location_uses_key_layout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::with_objects([("2024/01/17/12/u/gba/x.sav", b"remote")]));
        let store = indexed(backend).await;
        let local = File::new("gba", temp_dir.path().join("gba/x.sav"), UtcDateTime::now());
        let identity = Identity::of("u", &local);
        store.index().unwrap().upsert(&identity, "", &local).await.unwrap();

        let requested = File::new("2024/01/17/12/gba", "/unused/x.sav", UtcDateTime::now());
        let destination = temp_dir.path().join("x.sav");
        store.retrieve(RetrieveRequest { to_retrieve: requested, destination: destination.clone() }).await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"remote");
    }

    #[tokio::test]
    async fn test_retrieve_index_failure_aborts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::with_objects([("2024/01/17/12/u/gba/x.sav", b"stale")]));
        let db = Database::connect_in_memory().await.unwrap();
        // Never initialized, so every lookup fails.
        let index = MetadataIndex::new(&db, "retrosync_files", "u", true).unwrap();
        let store = ObjectStore::new(backend, "u").with_index(index);
        let requested = File::new("2024/01/17/12/gba", "/unused/x.sav", UtcDateTime::now());
        let destination = temp_dir.path().join("x.sav");
        let err = store.retrieve(RetrieveRequest { to_retrieve: requested, destination: destination.clone() }).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Index));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_retrieve_with_disabled_index_aborts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::with_objects([("2024/01/17/12/u/gba/x.sav", b"stale")]));
        let store = ObjectStore::new(backend, "u").with_index(MetadataIndex::disabled("u"));
        let requested = File::new("2024/01/17/12/gba", "/unused/x.sav", UtcDateTime::now());
        let destination = temp_dir.path().join("x.sav");
        let err = store.retrieve(RetrieveRequest { to_retrieve: requested, destination: destination.clone() }).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Index));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_retrieve_truncates_destination() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::with_objects([("2024/01/17/12/u/gba/x.sav", b"short")]));
        let store = ObjectStore::new(backend, "u");
        let destination = temp_dir.path().join("x.sav");
        std::fs::write(&destination, b"a much longer local file").unwrap();
        let requested = File::new("2024/01/17/12/gba", "/unused/x.sav", UtcDateTime::now());
        store.retrieve(RetrieveRequest { to_retrieve: requested, destination: destination.clone() }).await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"short");
    }

    #[tokio::test]
    async fn test_retrieve_missing_object() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(Arc::new(MockBackend::default()), "u");
        let requested = File::new("2024/01/17/12/gba", "/unused/x.sav", UtcDateTime::now());
        let destination = temp_dir.path().join("x.sav");
        let err = store.retrieve(RetrieveRequest { to_retrieve: requested, destination: destination.clone() }).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Storage));
        assert!(!destination.exists());
    }
}
