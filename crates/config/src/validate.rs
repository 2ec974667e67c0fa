//! Owner name rules.
//!
//! The owner becomes a path segment in every object key and a prefix of every
//! metadata identity, so it is kept to a conservative character set.

use crate::error::{ErrorKind, Result};

/// Placeholder written into generated example configurations.
pub const DEFAULT_OWNER: &str = "DEFAULT_USERNAME_CHANGE_THIS_VALUE";
pub const OWNER_MIN_LENGTH: usize = 3;
pub const OWNER_MAX_LENGTH: usize = 1024;

const ADDITIONAL_OWNER_CHARS: [char; 3] = ['-', '_', '.'];

/// Validate an owner name.
///
/// # Examples
///
/// ```
/// use retrosync_config::validate_owner;
/// assert!(validate_owner("retro-player").is_ok());
/// assert!(validate_owner("no").is_err());
/// assert!(validate_owner("a/b/c").is_err());
/// ```
pub fn validate_owner(owner: &str) -> Result<()> {
    if owner == DEFAULT_OWNER {
        exn::bail!(ErrorKind::DefaultOwner);
    }
    if owner.is_empty() {
        exn::bail!(ErrorKind::InvalidOwner("owner is empty".to_string()));
    }
    // Length is counted in characters, not bytes.
    let length = owner.chars().count();
    if !(OWNER_MIN_LENGTH..=OWNER_MAX_LENGTH).contains(&length) {
        exn::bail!(ErrorKind::InvalidOwner(format!(
            "owner has invalid length; must be {OWNER_MIN_LENGTH} <= length <= {OWNER_MAX_LENGTH}"
        )));
    }
    if let Some(c) = owner.chars().find(|c| !c.is_alphanumeric() && !ADDITIONAL_OWNER_CHARS.contains(c)) {
        exn::bail!(ErrorKind::InvalidOwner(format!("owner contains illegal character '{c}'; must be alphanumeric")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("asdf1234")]
    #[case("abc")]
    #[case("retro-player_01.pi")]
    #[case("jöran")]
    fn test_valid_owner(#[case] owner: &str) {
        validate_owner(owner).unwrap();
    }

    #[rstest]
    #[case("")]
    #[case("a")]
    #[case("ab")]
    #[case("look/at/meI'm%special")]
    #[case("has space")]
    #[case("hash#sign")]
    fn test_invalid_owner(#[case] owner: &str) {
        let err = validate_owner(owner).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidOwner(_)));
    }

    #[test]
    fn test_owner_too_long() {
        let owner = "a".repeat(OWNER_MAX_LENGTH + 1);
        let err = validate_owner(&owner).unwrap_err();
        assert!(err.to_string().contains("invalid length"));
        assert!(validate_owner(&"a".repeat(OWNER_MAX_LENGTH)).is_ok());
    }

    #[test]
    fn test_illegal_character_is_named() {
        let err = validate_owner("look/at/me").unwrap_err();
        assert!(err.to_string().contains("illegal character '/'"));
    }

    #[test]
    fn test_default_owner_rejected() {
        let err = validate_owner(DEFAULT_OWNER).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DefaultOwner));
    }
}
