//! Example configuration generation.

use crate::error::{ErrorKind, Result};
use crate::{Config, S3Config, StorageConfig};
use exn::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};

pub const EXAMPLE_FILE_NAME: &str = "config.example.yaml";

impl Config {
    /// The configuration written by [`write_example`]: S3 enabled, saves and
    /// states synced, ROMs left alone, and the placeholder owner that
    /// [`validate`](Config::validate) refuses.
    pub fn example() -> Self {
        Self {
            storage: StorageConfig {
                s3: S3Config { enabled: true, ..S3Config::default() },
                ..StorageConfig::default()
            },
            ..Self::default()
        }
    }
}

/// Write [`Config::example`] as YAML into `dir`, creating it if needed.
///
/// Returns the path of the written file.
pub fn write_example(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let target = dir.join(EXAMPLE_FILE_NAME);
    fs::create_dir_all(dir).or_raise(|| ErrorKind::Example(target.clone()))?;
    let yaml = serde_yaml::to_string(&Config::example()).or_raise(|| ErrorKind::Example(target.clone()))?;
    fs::write(&target, yaml).or_raise(|| ErrorKind::Example(target.clone()))?;
    tracing::info!(path = %target.display(), "Created example configuration");
    Ok(target)
}
