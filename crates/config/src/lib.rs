//! Layered configuration for retrosync.
//!
//! Configuration is merged from (lowest to highest priority):
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A configuration file (YAML, TOML or JSON, chosen by extension)
//! 3. Environment variables prefixed with `RETROSYNC_`, using `__` to nest
//!    (e.g. `RETROSYNC_STORAGE__S3__KEY_SECRET`)
//!
//! Credentials are never required to live in the file; the environment layer
//! exists so they don't have to.

pub mod error;
mod example;
mod validate;

pub use crate::example::{EXAMPLE_FILE_NAME, write_example};
pub use crate::validate::{DEFAULT_OWNER, OWNER_MAX_LENGTH, OWNER_MIN_LENGTH, validate_owner};
use crate::error::{ErrorKind, Result};
use directories::{BaseDirs, ProjectDirs};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "RETROSYNC_";
const LEGACY_OWNER_KEY: &str = "username";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Namespace that every uploaded key and metadata identity is scoped
    /// under, so several devices/users can share one container.
    ///
    /// Files may spell this `username`; see [`Config::figment`].
    pub owner: String,
    /// Root directory that is scanned for ROM, save and state files.
    pub roms_folder: PathBuf,
    pub sync: SyncKinds,
    pub storage: StorageConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            roms_folder: default_roms_folder(),
            sync: SyncKinds::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Which file kinds take part in a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncKinds {
    pub roms: bool,
    pub saves: bool,
    pub states: bool,
}
impl Default for SyncKinds {
    fn default() -> Self {
        Self { roms: false, saves: true, states: true }
    }
}

/// Per-backend settings. Exactly one backend may be enabled at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub s3: S3Config,
    pub local: LocalConfig,
    pub sftp: StubConfig,
    pub drive: StubConfig,
}

/// S3-compatible object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub enabled: bool,
    pub bucket: String,
    pub create_missing_resources: bool,
    pub region: String,
    /// Custom endpoint for non-AWS services (MinIO, Backblaze, LocalStack).
    pub endpoint: Option<String>,
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
    pub index: IndexConfig,
}
impl Default for S3Config {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: "retropie-sync".to_string(),
            create_missing_resources: false,
            region: "us-east-1".to_string(),
            endpoint: None,
            key_id: None,
            key_secret: None,
            index: IndexConfig::default(),
        }
    }
}

/// A directory (NAS mount, external drive) used as the object store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub create_missing_resources: bool,
    pub index: IndexConfig,
}

/// Secondary metadata index attached to an object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub enabled: bool,
    pub table: String,
    pub create_missing_resources: bool,
    /// SQLite database file. Defaults to `index.sqlite` in the data directory.
    pub path: Option<PathBuf>,
}
impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            table: "retrosync_files".to_string(),
            create_missing_resources: false,
            path: None,
        }
    }
}
impl IndexConfig {
    pub fn database_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| data_dir().join("index.sqlite"))
    }
}

/// Settings for backends that only exist as stubs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubConfig {
    pub enabled: bool,
}

/// The single backend selected by [`StorageConfig::selected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend<'a> {
    S3(&'a S3Config),
    Local(&'a LocalConfig),
    Sftp(&'a StubConfig),
    Drive(&'a StubConfig),
}

impl StorageConfig {
    /// Returns the one enabled backend.
    pub fn selected(&self) -> Result<Backend<'_>> {
        let mut enabled = Vec::new();
        if self.s3.enabled {
            enabled.push(("s3", Backend::S3(&self.s3)));
        }
        if self.local.enabled {
            enabled.push(("local", Backend::Local(&self.local)));
        }
        if self.sftp.enabled {
            enabled.push(("sftp", Backend::Sftp(&self.sftp)));
        }
        if self.drive.enabled {
            enabled.push(("drive", Backend::Drive(&self.drive)));
        }
        match enabled.len() {
            0 => exn::bail!(ErrorKind::NoBackend),
            1 => Ok(enabled.remove(0).1),
            _ => {
                let names: Vec<_> = enabled.iter().map(|(name, _)| *name).collect();
                exn::bail!(ErrorKind::MultipleBackends(names.join(", ")))
            },
        }
    }
}

impl Config {
    /// Build the layered [`Figment`] without extracting it.
    ///
    /// A missing file is not an error (the provider is simply empty), which
    /// lets a fully environment-driven setup work without any file at all.
    ///
    /// A file-level `username` key is read as `owner` and takes precedence
    /// over an `owner` key in the same file. The environment still overrides
    /// both.
    pub fn figment(path: Option<&Path>) -> Figment {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => figment.merge(Toml::file(&path)),
            Some("json") => figment.merge(Json::file(&path)),
            _ => figment.merge(Yaml::file(&path)),
        };
        let figment = match figment.find_value(LEGACY_OWNER_KEY) {
            Ok(username) => figment.merge(Serialized::default("owner", username)),
            Err(_) => figment,
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(path).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(owner = %config.owner, roms_folder = %config.roms_folder.display(), "Loaded configuration");
        Ok(config)
    }

    /// Check the owner and the storage selection.
    pub fn validate(&self) -> Result<()> {
        validate_owner(&self.owner)?;
        match self.storage.selected()? {
            Backend::S3(s3) if s3.bucket.trim().is_empty() => exn::bail!(ErrorKind::MissingField("storage.s3.bucket")),
            Backend::S3(s3) if s3.index.enabled && s3.index.table.trim().is_empty() => {
                exn::bail!(ErrorKind::MissingField("storage.s3.index.table"))
            },
            Backend::Local(local) if local.path.as_os_str().is_empty() => {
                exn::bail!(ErrorKind::MissingField("storage.local.path"))
            },
            Backend::Local(local) if local.index.enabled && local.index.table.trim().is_empty() => {
                exn::bail!(ErrorKind::MissingField("storage.local.index.table"))
            },
            _ => Ok(()),
        }
    }
}

/// `~/.config/retrosync/config.yaml` (or the platform equivalent).
pub fn default_config_path() -> PathBuf {
    match ProjectDirs::from("", "", "retrosync") {
        Some(dirs) => dirs.config_dir().join("config.yaml"),
        None => PathBuf::from("config.yaml"),
    }
}

fn data_dir() -> PathBuf {
    match ProjectDirs::from("", "", "retrosync") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from("."),
    }
}

fn default_roms_folder() -> PathBuf {
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join("RetroPie").join("roms"),
        None => PathBuf::from("roms"),
    }
}
