//! Stable file identities.
//!
//! An identity locates a file's metadata record independently of where the
//! object currently lives (which changes every time the file is uploaded in a
//! new time bucket).

use crate::file::File;
use derive_more::Display;

/// `{owner}#{logical-dir}#{normalized-name}`.
///
/// Names are normalized by replacing spaces with underscores and lowercasing,
/// so `Pokemon Emerald.sav` and `pokemon_emerald.SAV` share one identity.
/// That collapse is deliberate: the index is case-insensitive.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn new(owner: &str, dir: &str, name: &str) -> Self {
        Self(format!("{owner}#{dir}#{}", normalize_name(name)))
    }

    /// Identity of a file record for the given owner.
    pub fn of(owner: &str, file: &File) -> Self {
        Self::new(owner, &file.dir, &file.name)
    }

    /// Wrap an identity string read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

/// Spaces become underscores, then everything is lowercased.
///
/// ```
/// use retrosync_storage::identity::normalize_name;
/// assert_eq!(normalize_name("Pokemon Emerald.SAV"), "pokemon_emerald.sav");
/// ```
pub fn normalize_name(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::UtcDateTime;

    #[test]
    fn test_format() {
        assert_eq!(Identity::new("u", "gba", "Pokemon Emerald.sav").as_str(), "u#gba#pokemon_emerald.sav");
        assert_eq!(Identity::new("u", "", "x.sav").as_str(), "u##x.sav");
    }

    #[rstest]
    #[case("Pokemon Emerald.sav", "pokemon emerald.sav")]
    #[case("Pokemon Emerald.sav", "POKEMON_EMERALD.SAV")]
    #[case("Pokemon Emerald.sav", "pokemon_Emerald.sav")]
    #[case("a b c.srm", "A_B_C.srm")]
    fn test_names_collapse(#[case] left: &str, #[case] right: &str) {
        assert_eq!(Identity::new("u", "gba", left), Identity::new("u", "gba", right));
    }

    #[rstest]
    // Only the name is normalized; owner and directory are taken verbatim.
    #[case(("u", "gba", "x.sav"), ("u", "GBA", "x.sav"))]
    #[case(("u", "gba", "x.sav"), ("U", "gba", "x.sav"))]
    #[case(("u", "gba", "x.sav"), ("u", "gbc", "x.sav"))]
    #[case(("u", "gba", "x.sav"), ("u", "gba", "x.srm"))]
    fn test_distinct(#[case] left: (&str, &str, &str), #[case] right: (&str, &str, &str)) {
        assert_ne!(Identity::new(left.0, left.1, left.2), Identity::new(right.0, right.1, right.2));
    }

    #[test]
    fn test_of_file() {
        let file = File::new("snes", "/roms/snes/Super Metroid.srm", UtcDateTime::now());
        assert_eq!(Identity::of("pi", &file).to_string(), "pi#snes#super_metroid.srm");
    }
}
