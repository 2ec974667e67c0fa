//! The metadata index.
//!
//! Maps a file's [`Identity`] to the object key its latest upload was stored
//! under. The object store is the source of truth: the index is derived, and
//! is only ever written after a successful upload.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::record::to_millis;
use crate::models::{MetadataRecord, RecordRow};
use exn::ResultExt;
use retrosync_storage::{File, Identity};
use sqlx::SqlitePool;
use time::UtcDateTime;

const MAX_TABLE_NAME: usize = 64;

/// Metadata index backed by a single SQLite table.
///
/// A disabled index accepts writes silently and refuses reads with
/// [`ErrorKind::NotImplemented`].
#[derive(Debug, Clone)]
pub struct MetadataIndex {
    owner: String,
    table: String,
    create_missing: bool,
    pool: Option<SqlitePool>,
}

impl MetadataIndex {
    /// Index over `table` in the given database.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidTable`] unless the table name is a plain
    /// identifier (ASCII letters, digits and underscores, not starting with
    /// a digit).
    pub fn new(db: &Database, table: impl Into<String>, owner: impl Into<String>, create_missing: bool) -> Result<Self> {
        let table = validate_table(table.into())?;
        Ok(Self { owner: owner.into(), table, create_missing, pool: Some(db.pool().clone()) })
    }

    pub fn disabled(owner: impl Into<String>) -> Self {
        Self { owner: owner.into(), table: String::new(), create_missing: false, pool: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Make sure the index table exists.
    ///
    /// Creates it when missing and creation is permitted. Disabled indexes
    /// have nothing to check.
    pub async fn init(&self) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        if self.table_exists(pool).await? {
            tracing::info!(table = %self.table, "Metadata index table exists");
            return Ok(());
        }
        if !self.create_missing {
            exn::bail!(ErrorKind::TableMissing(self.table.clone()));
        }
        let statement = format!(
            r#"CREATE TABLE IF NOT EXISTS "{}" (
                identity      TEXT    NOT NULL PRIMARY KEY,
                location      TEXT    NOT NULL,
                original_name TEXT    NOT NULL,
                dir           TEXT    NOT NULL,
                owner         TEXT    NOT NULL,
                kind          TEXT    NOT NULL,
                last_modified INTEGER NOT NULL,
                created       INTEGER NOT NULL
            ) WITHOUT ROWID"#,
            self.table
        );
        sqlx::query(&statement).execute(pool).await.or_raise(|| ErrorKind::Database)?;
        tracing::info!(table = %self.table, "Created metadata index table");
        Ok(())
    }

    async fn table_exists(&self, pool: &SqlitePool) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(&self.table)
            .fetch_optional(pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.is_some())
    }

    /// Record `location` as the latest upload of `file`.
    ///
    /// `last_modified` is set to now. An existing record's `created` is
    /// carried forward; the read and the write are separate statements, so
    /// two processes upserting the same identity concurrently may race.
    pub async fn upsert(&self, identity: &Identity, location: &str, file: &File) -> Result<()> {
        self.upsert_at(identity, location, file, UtcDateTime::now()).await
    }

    pub(crate) async fn upsert_at(
        &self,
        identity: &Identity,
        location: &str,
        file: &File,
        now: UtcDateTime,
    ) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        let now = to_millis(now);
        let created = match self.get(identity).await? {
            Some(existing) => {
                if existing.created > now {
                    tracing::warn!(
                        identity = %identity,
                        created = existing.created,
                        now,
                        "Clock is behind the stored creation time"
                    );
                }
                existing.created
            },
            None => now,
        };
        let record = MetadataRecord {
            identity: identity.clone(),
            location: location.to_string(),
            original_name: file.name.clone(),
            dir: file.dir.clone(),
            owner: self.owner.clone(),
            kind: file.kind,
            last_modified: now,
            created,
        };
        let row = RecordRow::from(&record);
        let statement = format!(
            r#"INSERT OR REPLACE INTO "{}"
                (identity, location, original_name, dir, owner, kind, last_modified, created)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            self.table
        );
        sqlx::query(&statement)
            .bind(row.identity)
            .bind(row.location)
            .bind(row.original_name)
            .bind(row.dir)
            .bind(row.owner)
            .bind(row.kind)
            .bind(row.last_modified)
            .bind(row.created)
            .execute(pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::info!(identity = %identity, location, "Stored file metadata");
        Ok(())
    }

    /// Look up the record for an identity.
    pub async fn get(&self, identity: &Identity) -> Result<Option<MetadataRecord>> {
        let Some(pool) = &self.pool else {
            exn::bail!(ErrorKind::NotImplemented);
        };
        let statement = format!(
            r#"SELECT identity, location, original_name, dir, owner, kind, last_modified, created
                FROM "{}" WHERE identity = ?"#,
            self.table
        );
        let row: Option<RecordRow> = sqlx::query_as(&statement)
            .bind(identity.as_str())
            .fetch_optional(pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(MetadataRecord::try_from).transpose()
    }

    /// Look up the record for a file owned by this index's owner.
    pub async fn get_by_file(&self, file: &File) -> Result<Option<MetadataRecord>> {
        self.get(&Identity::of(&self.owner, file)).await
    }
}

fn validate_table(table: String) -> Result<String> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        },
        None => false,
    };
    if !valid || table.len() > MAX_TABLE_NAME {
        exn::bail!(ErrorKind::InvalidTable(table));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::Duration;

    const TABLE: &str = "retrosync_files";

    async fn index() -> MetadataIndex {
        let db = Database::connect_in_memory().await.unwrap();
        let index = MetadataIndex::new(&db, TABLE, "u", true).unwrap();
        index.init().await.unwrap();
        index
    }

    fn save() -> File {
        File::new("gba", "/home/pi/RetroPie/roms/gba/Pokemon Emerald.sav", UtcDateTime::now())
    }

    #[rstest]
    #[case("retrosync_files", true)]
    #[case("_files2", true)]
    #[case("Files", true)]
    #[case("", false)]
    #[case("2files", false)]
    #[case("files; DROP TABLE x", false)]
    #[case("files\"", false)]
    #[case("retro-sync", false)]
    fn test_validate_table(#[case] table: &str, #[case] valid: bool) {
        assert_eq!(validate_table(table.to_string()).is_ok(), valid);
    }

    #[test]
    fn test_table_name_length() {
        assert!(validate_table("a".repeat(64)).is_ok());
        assert!(validate_table("a".repeat(65)).is_err());
    }

    #[tokio::test]
    async fn test_init_creates_table() {
        let db = Database::connect_in_memory().await.unwrap();
        let index = MetadataIndex::new(&db, TABLE, "u", true).unwrap();
        assert!(!index.table_exists(db.pool()).await.unwrap());
        index.init().await.unwrap();
        assert!(index.table_exists(db.pool()).await.unwrap());
        // Second init finds the table
        index.init().await.unwrap();
    }

    #[tokio::test]
    async fn test_init_missing_table_not_permitted() {
        let db = Database::connect_in_memory().await.unwrap();
        let index = MetadataIndex::new(&db, TABLE, "u", false).unwrap();
        let err = index.init().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::TableMissing(t) if t == TABLE));
    }

    #[tokio::test]
    async fn test_init_existing_table_without_create() {
        let db = Database::connect_in_memory().await.unwrap();
        MetadataIndex::new(&db, TABLE, "u", true).unwrap().init().await.unwrap();
        MetadataIndex::new(&db, TABLE, "u", false).unwrap().init().await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let index = index().await;
        let file = save();
        let identity = Identity::of("u", &file);
        index.upsert(&identity, "2024/01/17/12/u/gba/Pokemon Emerald.sav", &file).await.unwrap();

        let record = index.get(&identity).await.unwrap().unwrap();
        assert_eq!(record.identity, identity);
        assert_eq!(record.location, "2024/01/17/12/u/gba/Pokemon Emerald.sav");
        assert_eq!(record.original_name, "Pokemon Emerald.sav");
        assert_eq!(record.dir, "gba");
        assert_eq!(record.owner, "u");
        assert_eq!(record.kind, retrosync_storage::FileKind::Save);
        assert_eq!(record.created, record.last_modified);

        let by_file = index.get_by_file(&file).await.unwrap().unwrap();
        assert_eq!(by_file, record);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let index = index().await;
        assert_eq!(index.get(&Identity::new("u", "gba", "nope.sav")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_preserves_created() {
        let index = index().await;
        let file = save();
        let identity = Identity::of("u", &file);
        let first = UtcDateTime::now() - Duration::hours(2);
        let second = first + Duration::hours(1);
        index.upsert_at(&identity, "2024/01/17/10/u/gba/a.sav", &file, first).await.unwrap();
        index.upsert_at(&identity, "2024/01/17/11/u/gba/a.sav", &file, second).await.unwrap();

        let record = index.get(&identity).await.unwrap().unwrap();
        assert_eq!(record.created, to_millis(first));
        assert_eq!(record.last_modified, to_millis(second));
        assert_eq!(record.location, "2024/01/17/11/u/gba/a.sav");
        assert!(record.created <= record.last_modified);
    }

    #[tokio::test]
    async fn test_upsert_with_earlier_clock() {
        let index = index().await;
        let file = save();
        let identity = Identity::of("u", &file);
        let now = UtcDateTime::now();
        index.upsert_at(&identity, "a", &file, now).await.unwrap();
        let earlier = now - Duration::minutes(5);
        index.upsert_at(&identity, "b", &file, earlier).await.unwrap();
        let record = index.get(&identity).await.unwrap().unwrap();
        assert_eq!(record.created, to_millis(now));
        assert_eq!(record.last_modified, to_millis(earlier));
        assert_eq!(record.location, "b");
    }

    #[tokio::test]
    async fn test_collapsed_names_share_a_record() {
        let index = index().await;
        let spaced = save();
        let underscored = File::new("gba", "/r/gba/pokemon_emerald.sav", UtcDateTime::now());
        index.upsert(&Identity::of("u", &spaced), "first", &spaced).await.unwrap();
        index.upsert(&Identity::of("u", &underscored), "second", &underscored).await.unwrap();
        let record = index.get_by_file(&spaced).await.unwrap().unwrap();
        assert_eq!(record.location, "second");
        assert_eq!(record.original_name, "pokemon_emerald.sav");
    }

    #[tokio::test]
    async fn test_disabled() {
        let index = MetadataIndex::disabled("u");
        assert!(!index.is_enabled());
        index.init().await.unwrap();
        let file = save();
        let identity = Identity::of("u", &file);
        index.upsert(&identity, "anywhere", &file).await.unwrap();
        let err = index.get(&identity).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotImplemented));
        let err = index.get_by_file(&file).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotImplemented));
    }

    #[tokio::test]
    async fn test_persists_across_connections() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("index.sqlite");
        let file = save();
        let identity = Identity::of("u", &file);
        {
            let db = Database::connect(&path).await.unwrap();
            let index = MetadataIndex::new(&db, TABLE, "u", true).unwrap();
            index.init().await.unwrap();
            index.upsert(&identity, "somewhere", &file).await.unwrap();
            db.close().await;
        }
        let db = Database::connect(&path).await.unwrap();
        let index = MetadataIndex::new(&db, TABLE, "u", false).unwrap();
        index.init().await.unwrap();
        assert_eq!(index.get(&identity).await.unwrap().unwrap().location, "somewhere");
    }
}
