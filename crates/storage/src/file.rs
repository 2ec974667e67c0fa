//! Local file records and kind classification.

use derive_more::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use time::UtcDateTime;

/// Category of a synced file, derived from its extension.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum FileKind {
    #[display("rom")]
    Rom,
    #[display("save")]
    Save,
    #[display("state")]
    State,
    /// Anything not in the suffix table. Never synced unless explicitly
    /// requested.
    #[display("other")]
    Other,
}
impl FileKind {
    /// Classify by extension. Matching is exact (case-sensitive), mirroring
    /// the emulators that write these files.
    ///
    /// ```
    /// use retrosync_storage::FileKind;
    /// assert_eq!(FileKind::from_path("gba/Pokemon Emerald.gba"), FileKind::Rom);
    /// assert_eq!(FileKind::from_path("gba/Pokemon Emerald.sav"), FileKind::Save);
    /// assert_eq!(FileKind::from_path("gba/Pokemon Emerald.state3"), FileKind::State);
    /// assert_eq!(FileKind::from_path("gba/readme.txt"), FileKind::Other);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("gb" | "gbc" | "gba" | "smc" | "z64" | "nes") => Self::Rom,
            Some("srm" | "sav" | "rtc") => Self::Save,
            Some("state" | "state1" | "state2" | "state3" | "state4") => Self::State,
            _ => Self::Other,
        }
    }

    /// Lowercase word stored alongside metadata records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rom => "rom",
            Self::Save => "save",
            Self::State => "state",
            Self::Other => "other",
        }
    }
}
impl FromStr for FileKind {
    type Err = UnknownFileKind;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rom" => Ok(Self::Rom),
            "save" => Ok(Self::Save),
            "state" => Ok(Self::State),
            "other" => Ok(Self::Other),
            _ => Err(UnknownFileKind(s.to_string())),
        }
    }
}

#[derive(Debug, Display, derive_more::Error)]
#[display("unknown file kind: {_0}")]
pub struct UnknownFileKind(#[error(not(source))] String);

/// A file discovered under the sync root.
///
/// Re-created by every scan; nothing here is persisted between passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Logical directory: the parent directory relative to the sync root,
    /// `/`-separated, empty for files directly under the root.
    pub dir: String,
    /// Absolute local path
    pub path: PathBuf,
    /// File name including extension
    pub name: String,
    /// Last modified timestamp
    pub modified: UtcDateTime,
    pub kind: FileKind,
}
impl File {
    /// Create a file record, deriving name and kind from `path`.
    pub fn new(dir: impl Into<String>, path: impl Into<PathBuf>, modified: UtcDateTime) -> Self {
        let path = path.into();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let kind = FileKind::from_path(&name);
        Self { dir: dir.into(), path, name, modified, kind }
    }

    /// Replace the file name, keeping everything else (including kind).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the logical directory.
    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn is_older_than(&self, other: &File) -> bool {
        self.modified < other.modified
    }
}
