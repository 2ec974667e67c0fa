//! Directory scans.
//!
//! The catalog is a snapshot of the sync root taken at the start of a pass.
//! Nothing is cached between passes; every sync re-scans.

use crate::error::{ErrorKind, Result};
use crate::file::{File, FileKind};
use exn::ResultExt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(File),
    Descend(PathBuf),
    Skip,
}

/// Every file found under a root directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    files: Vec<File>,
}

impl Catalog {
    /// Recursively scan `root`.
    ///
    /// The root must exist and be a directory. Sub-directories are descended
    /// but symlinked directories are not, so a link cannot loop back to an
    /// ancestor or list the same files under a second directory. Symlinks to
    /// files are included. Anything else (including broken symlinks) is
    /// skipped. Files are sorted by path so passes are processed in a stable
    /// order.
    pub async fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let metadata = fs::metadata(&root).await.map_err(|e| ErrorKind::from_io(e, &root))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }

        let mut files = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(current) = stack.pop() {
            let mut entries = fs::read_dir(&current)
                .await
                .map_err(|e| ErrorKind::from_io(e, &current))
                .or_raise(|| ErrorKind::Scan(current.clone()))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| ErrorKind::from_io(e, &current))
                .or_raise(|| ErrorKind::Scan(current.clone()))?
            {
                match Self::process_entry(&root, entry).await? {
                    WalkEntry::File(file) => files.push(file),
                    WalkEntry::Descend(dir) => {
                        tracing::debug!(directory = %dir.display(), "Found sub-directory");
                        stack.push(dir)
                    },
                    WalkEntry::Skip => {},
                }
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(root = %root.display(), files = files.len(), "Scanned sync root");
        Ok(Self { root, files })
    }

    async fn process_entry(root: &Path, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| ErrorKind::from_io(e, &path))?;
        if file_type.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if file_type.is_file() {
            let metadata = entry.metadata().await.map_err(|e| ErrorKind::from_io(e, &path))?;
            return Ok(WalkEntry::File(Self::file(root, path, &metadata)?));
        }
        if file_type.is_symlink() {
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(WalkEntry::Skip),
                Err(e) => exn::bail!(ErrorKind::from_io(e, &path)),
            };
            if metadata.is_file() {
                return Ok(WalkEntry::File(Self::file(root, path, &metadata)?));
            }
            tracing::debug!(path = %path.display(), "Skipping symlink that is not a file");
        }
        Ok(WalkEntry::Skip)
    }

    fn file(root: &Path, path: PathBuf, metadata: &Metadata) -> Result<File> {
        let modified = metadata.modified().map_err(|e| ErrorKind::from_io(e, &path))?.into();
        Ok(File::new(logical_dir(root, &path)?, path, modified))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All files, regardless of kind.
    pub fn files(&self) -> &[File] {
        &self.files
    }

    /// Files of one kind, in scan order.
    pub fn files_of(&self, kind: FileKind) -> Vec<&File> {
        self.files.iter().filter(|f| f.kind == kind).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Parent directory of `path` relative to `root`, `/`-separated.
fn logical_dir(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).or_raise(|| {
        ErrorKind::BackendError(format!("path `{}` is not within root `{}`", path.display(), root.display()))
    })?;
    let Some(parent) = relative.parent() else {
        return Ok(String::new());
    };
    let segments: Option<Vec<&str>> = parent.components().map(|c| c.as_os_str().to_str()).collect();
    match segments {
        Some(segments) => Ok(segments.join("/")),
        None => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
    }
}
