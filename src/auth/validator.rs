//! Nickname validation
//!
//! Applied when an account is created; existing accounts are never re-checked.

use crate::error::RegistryError;

pub const MAX_NICKNAME_LENGTH: usize = 32;

/// Rejects empty, over-long, or otherwise unusable nicknames.
///
/// Commas are refused because the online listing is comma separated.
pub fn validate_nickname(nickname: &str) -> Result<(), RegistryError> {
    if nickname.is_empty() {
        return Err(RegistryError::InvalidNickname("nickname is empty".into()));
    }

    if nickname.chars().count() > MAX_NICKNAME_LENGTH {
        return Err(RegistryError::InvalidNickname(format!(
            "longer than {} characters",
            MAX_NICKNAME_LENGTH
        )));
    }

    if nickname
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == ',')
    {
        return Err(RegistryError::InvalidNickname(format!(
            "'{}' contains whitespace, control characters or commas",
            nickname
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        assert!(validate_nickname("a").is_ok());
        assert!(validate_nickname("alice_01").is_ok());
        assert!(validate_nickname("ÿsolde").is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        assert!(validate_nickname("").is_err());
        assert!(validate_nickname("two words").is_err());
        assert!(validate_nickname("a,b").is_err());
        assert!(validate_nickname("tab\there").is_err());
        assert!(validate_nickname(&"x".repeat(MAX_NICKNAME_LENGTH + 1)).is_err());
    }
}
