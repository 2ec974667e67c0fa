use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use retrosync_storage::{FileKind, Identity};
use time::UtcDateTime;

/// Where a file's latest upload lives, and when it was recorded.
///
/// Timestamps are epoch milliseconds. `created` is set by the first upsert of
/// an identity and carried forward by every later one; `last_modified` is the
/// time of the most recent upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub identity: Identity,
    /// Object key of the most recent upload
    pub location: String,
    /// File name as it was on disk, before normalization
    pub original_name: String,
    pub dir: String,
    pub owner: String,
    pub kind: FileKind,
    pub last_modified: i64,
    pub created: i64,
}
impl MetadataRecord {
    /// `last_modified` as a timestamp, or `None` when unset (zero) or out of
    /// range.
    pub fn last_modified_at(&self) -> Option<UtcDateTime> {
        if self.last_modified <= 0 {
            return None;
        }
        from_millis(self.last_modified)
    }

    pub fn created_at(&self) -> Option<UtcDateTime> {
        from_millis(self.created)
    }
}

/// Milliseconds since the Unix epoch, the resolution records are kept at.
pub(crate) fn to_millis(at: UtcDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_millis(millis: i64) -> Option<UtcDateTime> {
    UtcDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

#[derive(sqlx::FromRow)]
pub(crate) struct RecordRow {
    pub(crate) identity: String,
    pub(crate) location: String,
    pub(crate) original_name: String,
    pub(crate) dir: String,
    pub(crate) owner: String,
    pub(crate) kind: String,
    pub(crate) last_modified: i64,
    pub(crate) created: i64,
}
impl From<&MetadataRecord> for RecordRow {
    fn from(record: &MetadataRecord) -> Self {
        Self {
            identity: record.identity.to_string(),
            location: record.location.clone(),
            original_name: record.original_name.clone(),
            dir: record.dir.clone(),
            owner: record.owner.clone(),
            kind: record.kind.as_str().to_string(),
            last_modified: record.last_modified,
            created: record.created,
        }
    }
}
impl TryFrom<RecordRow> for MetadataRecord {
    type Error = Error;
    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            identity: Identity::from_raw(row.identity),
            location: row.location,
            original_name: row.original_name,
            dir: row.dir,
            owner: row.owner,
            kind: row.kind.parse::<FileKind>().or_raise(|| ErrorKind::InvalidData("file kind"))?,
            last_modified: row.last_modified,
            created: row.created,
        })
    }
}
