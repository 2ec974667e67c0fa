pub(crate) mod record;

pub use self::record::MetadataRecord;
pub(crate) use self::record::RecordRow;
