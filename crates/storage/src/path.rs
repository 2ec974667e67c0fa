//! Object key layout and validation.
//!
//! Every object is stored under `{bucket}/{owner}/{logical-dir}/{file-name}`,
//! where the bucket is the `YYYY/MM/DD/HH` time bucket of the sync pass that
//! uploaded it. The layout is shared with already-uploaded data, so the
//! functions here must stay bit-exact.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a relative storage path.
///
/// Ensures that paths don't escape the storage root (no `..` traversal),
/// don't carry null bytes and aren't empty once `.` and repeated separators
/// are removed.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use retrosync_storage::validate_path;
/// assert!(validate_path("2024/01/17/12/pi/gba/x.sav").is_ok());
/// assert!(validate_path("gba/../x.sav").is_ok()); // (never leaves the root)
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(validate_path("gba//./x.sav").unwrap(), Path::new("gba/x.sav"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
    }
    Ok(components.into_iter().collect())
}

/// Validate an object key, returning it in normalized `/`-separated form.
pub fn validate_key(key: &str) -> Result<String> {
    let validated = validate(key)?;
    let segments: Vec<&str> = validated
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()
        .ok_or_else(|| exn::Exn::from(ErrorKind::InvalidPath(PathBuf::from(key))))?;
    Ok(segments.join("/"))
}

/// Build the object key for a file.
///
/// Empty segments are skipped, so an empty bucket yields
/// `{owner}/{dir}/{name}` and a file at the root of the sync directory yields
/// `{bucket}/{owner}/{name}`.
///
/// ```
/// use retrosync_storage::object_key;
/// assert_eq!(object_key("2024/01/17/12", "pi", "gba", "x.sav"), "2024/01/17/12/pi/gba/x.sav");
/// assert_eq!(object_key("2024/01/17/12/", "pi", "gba", "x.sav"), "2024/01/17/12/pi/gba/x.sav");
/// assert_eq!(object_key("", "pi", "gba", "x.sav"), "pi/gba/x.sav");
/// ```
pub fn object_key(bucket: &str, owner: &str, dir: &str, name: &str) -> String {
    [bucket.trim_matches('/'), owner, dir.trim_matches('/'), name]
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a bucket-qualified logical directory into `(bucket, dir)`.
///
/// The last `/`-separated segment is the logical directory, everything before
/// it is the time bucket. A directory with a single segment has no bucket.
///
/// ```
/// use retrosync_storage::split_bucket;
/// assert_eq!(split_bucket("2024/01/17/12/gba"), ("2024/01/17/12", "gba"));
/// assert_eq!(split_bucket("gba"), ("", "gba"));
/// ```
pub fn split_bucket(dir: &str) -> (&str, &str) {
    match dir.rsplit_once('/') {
        Some((bucket, dir)) => (bucket, dir),
        None => ("", dir),
    }
}
