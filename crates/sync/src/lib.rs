//! Bidirectional sync between a ROM folder and a remote store.
//!
//! A pass scans the local root once, then for every file of each requested
//! kind compares the local modification time against the remote one and
//! either uploads into the pass's [`TimeBucket`] or pulls the remote copy
//! back over the local file.
//!
//! ```no_run
//! # async fn run(config: &retrosync_config::Config) -> retrosync_sync::error::Result<()> {
//! use retrosync_sync::Syncer;
//!
//! let syncer = Syncer::from_config(config).await?;
//! syncer.init().await?;
//! let report = syncer.sync().await?;
//! println!("{} uploaded, {} downloaded", report.uploaded(), report.downloaded());
//! # Ok(())
//! # }
//! ```

mod bucket;
pub mod engine;
pub mod error;
pub mod job;
pub mod remote;
mod setup;

pub use crate::bucket::TimeBucket;
pub use crate::engine::{Action, DEFAULT_KINDS, KindReport, Report, Syncer, decide};
pub use crate::job::{JobGuard, JobSlot, JobStatus};
pub use crate::remote::{DriveStorage, ObjectStore, RetrieveRequest, SftpStorage, Storage, StorageHandle};
pub use crate::setup::{kinds_from_config, storage_from_config};
