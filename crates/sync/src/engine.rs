//! Two-way reconciliation.
//!
//! For each local file of a requested kind the engine asks the storage when
//! the file was last uploaded and pushes or pulls accordingly. The newest
//! copy wins; when both sides claim the same instant the remote copy wins.

use crate::bucket::TimeBucket;
use crate::error::{ErrorKind, Result};
use crate::remote::{RetrieveRequest, Storage, StorageHandle};
use derive_more::Display;
use exn::ResultExt;
use retrosync_storage::{Catalog, File, FileKind};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tracing::instrument;

/// Kinds a full pass processes, in order.
pub const DEFAULT_KINDS: [FileKind; 3] = [FileKind::Rom, FileKind::Save, FileKind::State];

/// What to do with one file.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The local copy is newer (or the remote has never seen it).
    #[display("upload")]
    Upload,
    /// The remote copy is at least as new as the local one.
    #[display("download")]
    Download,
}

/// Decide the direction for a file modified locally at `local`.
///
/// ```
/// use retrosync_sync::{Action, decide};
/// use time::macros::utc_datetime;
/// let local = utc_datetime!(2024-01-17 12:00);
/// assert_eq!(decide(local, None), Action::Upload);
/// assert_eq!(decide(local, Some(utc_datetime!(2024-01-17 11:00))), Action::Upload);
/// assert_eq!(decide(local, Some(local)), Action::Download);
/// ```
pub fn decide(local: UtcDateTime, remote: Option<UtcDateTime>) -> Action {
    match remote {
        None => Action::Upload,
        Some(remote) if local > remote => Action::Upload,
        Some(_) => Action::Download,
    }
}

/// Outcome of one kind's batch.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{kind}: {uploaded} uploaded, {downloaded} downloaded")]
pub struct KindReport {
    pub kind: FileKind,
    pub uploaded: usize,
    pub downloaded: usize,
}
impl KindReport {
    fn new(kind: FileKind) -> Self {
        Self { kind, uploaded: 0, downloaded: 0 }
    }

    fn record(&mut self, action: Action) {
        match action {
            Action::Upload => self.uploaded += 1,
            Action::Download => self.downloaded += 1,
        }
    }
}

/// Outcome of a full pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub bucket: TimeBucket,
    pub kinds: Vec<KindReport>,
}
impl Report {
    pub fn uploaded(&self) -> usize {
        self.kinds.iter().map(|k| k.uploaded).sum()
    }

    pub fn downloaded(&self) -> usize {
        self.kinds.iter().map(|k| k.downloaded).sum()
    }

    pub fn kind(&self, kind: FileKind) -> Option<&KindReport> {
        self.kinds.iter().find(|k| k.kind == kind)
    }
}

/// Reconciles a local directory against a [`Storage`](crate::Storage).
///
/// Holds no state between passes: every call to [`sync`](Self::sync)
/// re-scans the root and recomputes the time bucket.
pub struct Syncer {
    storage: StorageHandle,
    root: PathBuf,
    kinds: Vec<FileKind>,
}

impl Syncer {
    pub fn new(storage: StorageHandle, root: impl Into<PathBuf>, kinds: impl IntoIterator<Item = FileKind>) -> Self {
        Self { storage, root: root.into(), kinds: kinds.into_iter().collect() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kinds(&self) -> &[FileKind] {
        &self.kinds
    }

    pub fn storage(&self) -> &StorageHandle {
        &self.storage
    }

    /// Prepare remote resources. Call once before the first pass.
    pub async fn init(&self) -> Result<()> {
        self.storage.init().await
    }

    /// Run one pass with the current time.
    pub async fn sync(&self) -> Result<Report> {
        self.sync_at(UtcDateTime::now()).await
    }

    /// Run one pass as if started at `now`.
    ///
    /// Kinds are processed in the configured order. The first failure aborts
    /// the pass; files already transferred stay transferred.
    #[instrument(skip(self), fields(root = %self.root.display(), storage = %self.storage.name()))]
    pub async fn sync_at(&self, now: UtcDateTime) -> Result<Report> {
        let bucket = TimeBucket::at(now);
        let catalog = Catalog::scan(&self.root).await.or_raise(|| ErrorKind::Scan)?;
        let mut kinds = Vec::with_capacity(self.kinds.len());
        for kind in &self.kinds {
            kinds.push(self.sync_kind(&catalog, &bucket, *kind).await?);
        }
        let report = Report { bucket, kinds };
        tracing::info!(
            bucket = %report.bucket,
            uploaded = report.uploaded(),
            downloaded = report.downloaded(),
            "Sync pass complete"
        );
        Ok(report)
    }

    /// Reconcile every file of one kind.
    pub async fn sync_kind(&self, catalog: &Catalog, bucket: &TimeBucket, kind: FileKind) -> Result<KindReport> {
        let mut report = KindReport::new(kind);
        let files = catalog.files_of(kind);
        if files.is_empty() {
            tracing::debug!(%kind, "No files to sync");
            return Ok(report);
        }
        for file in files {
            report.record(self.sync_file(bucket, file).await?);
        }
        tracing::info!("{report}");
        Ok(report)
    }

    /// Reconcile a single file.
    pub async fn sync_file(&self, bucket: &TimeBucket, file: &File) -> Result<Action> {
        let remote = self
            .storage
            .last_modified(bucket.as_str(), file)
            .await
            .or_raise(|| ErrorKind::Lookup(file.path.clone()))?;
        let action = decide(file.modified, remote);
        tracing::info!(
            file = %file.path.display(),
            kind = %file.kind,
            local = %file.modified,
            remote = ?remote,
            %action,
            "Reconciling file"
        );
        match action {
            Action::Upload => {
                self.storage.store(bucket.as_str(), file).await.or_raise(|| ErrorKind::Upload(file.path.clone()))?;
            },
            Action::Download => {
                let request = RetrieveRequest {
                    to_retrieve: File { dir: format!("{bucket}/{}", file.dir), ..file.clone() },
                    destination: file.path.clone(),
                };
                self.storage.retrieve(request).await.or_raise(|| ErrorKind::Download(file.path.clone()))?;
            },
        }
        Ok(action)
    }
}
