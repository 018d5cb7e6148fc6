//! Credential validation and filesystem-safe naming for the account store.

use thiserror::Error;

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MAX_USERNAME_CHARS: usize = 32;
pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MAX_PASSWORD_CHARS: usize = 128;

/// Rejections raised before any account lookup happens.
///
/// The `Display` strings are the exact messages the service returns to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("ERROR: Username and password required")]
    Missing,

    #[error("ERROR: Username min 3 chars, password min 6 chars")]
    TooShort,

    #[error("ERROR: Username max 32 chars, password max 128 chars")]
    TooLong,

    #[error("ERROR: Username contains invalid characters")]
    InvalidCharacters,
}

/// Check a username/password pair against the registration rules.
///
/// Missing fields are reported before length problems, so an empty password
/// yields [`CredentialError::Missing`] rather than [`CredentialError::TooShort`].
pub fn validate_credentials(username: &str, password: &str) -> Result<(), CredentialError> {
    if username.is_empty() || password.is_empty() {
        return Err(CredentialError::Missing);
    }
    let user_len = username.chars().count();
    let pass_len = password.chars().count();
    if user_len < MIN_USERNAME_CHARS || pass_len < MIN_PASSWORD_CHARS {
        return Err(CredentialError::TooShort);
    }
    if user_len > MAX_USERNAME_CHARS || pass_len > MAX_PASSWORD_CHARS {
        return Err(CredentialError::TooLong);
    }
    if username.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(CredentialError::InvalidCharacters);
    }
    Ok(())
}

/// Generate safe filename from username using URL encoding
pub fn safe_filename(username: &str) -> String {
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
    utf8_percent_encode(username, NON_ALPHANUMERIC).to_string()
}

/// Reject account records larger than `max_bytes` before parsing them.
pub fn secure_json_parse<T>(content: &str, max_bytes: usize) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    if content.len() > max_bytes {
        anyhow::bail!("record exceeds {} bytes", max_bytes);
    }
    // Interrupted writes have been seen to leave leading NULs; valid JSON never starts with one.
    let normalized = content.trim_start_matches('\0');
    Ok(serde_json::from_str(normalized)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_win_over_length() {
        assert_eq!(validate_credentials("", "secret1"), Err(CredentialError::Missing));
        assert_eq!(validate_credentials("al", ""), Err(CredentialError::Missing));
    }

    #[test]
    fn length_boundaries() {
        assert_eq!(validate_credentials("al", "secret1"), Err(CredentialError::TooShort));
        assert_eq!(validate_credentials("alice", "12345"), Err(CredentialError::TooShort));
        assert!(validate_credentials("ali", "123456").is_ok());
        let long = "x".repeat(MAX_USERNAME_CHARS + 1);
        assert_eq!(validate_credentials(&long, "123456"), Err(CredentialError::TooLong));
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        // three characters, six bytes
        assert!(validate_credentials("ééé", "pässwd").is_ok());
    }

    #[test]
    fn rejects_whitespace_and_control() {
        assert_eq!(
            validate_credentials("al ice", "secret1"),
            Err(CredentialError::InvalidCharacters)
        );
        assert_eq!(
            validate_credentials("al\u{1}ce", "secret1"),
            Err(CredentialError::InvalidCharacters)
        );
    }

    #[test]
    fn safe_filename_blocks_traversal() {
        assert_eq!(safe_filename("detective"), "detective");
        assert!(!safe_filename("../etc/passwd").contains('/'));
    }

    #[test]
    fn oversized_records_are_rejected() {
        let big = format!("\"{}\"", "a".repeat(64));
        assert!(secure_json_parse::<String>(&big, 16).is_err());
        let parsed: String = secure_json_parse("\0\0\"ok\"", 16).unwrap();
        assert_eq!(parsed, "ok");
    }
}
