use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use delegate_core::DomainError;

/// Shortest code accepted from callers.
pub const MIN_CODE_LEN: usize = 10;

/// Length of generated codes (alphanumeric, ~190 bits of entropy).
pub const GENERATED_CODE_LEN: usize = 32;

/// Well-known code that provisions the first global administrator.
pub const BOOTSTRAP_CODE: &str = "00000000-0000-0000-0000-000000000000";

/// Opaque single-use invitation token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationCode(String);

impl InvitationCode {
    /// Draw a fresh code from the operating system's CSPRNG.
    pub fn generate() -> Self {
        let code: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(GENERATED_CODE_LEN)
            .map(char::from)
            .collect();
        Self(code)
    }

    pub fn bootstrap() -> Self {
        Self(BOOTSTRAP_CODE.to_string())
    }

    /// Accept a caller-supplied code. Blank or shorter than `MIN_CODE_LEN` is malformed.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Err(DomainError::validation("invitation code is empty"));
        }
        if raw.chars().count() < MIN_CODE_LEN {
            return Err(DomainError::validation(format!(
                "invitation code shorter than {MIN_CODE_LEN} characters"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_bootstrap(&self) -> bool {
        self.0 == BOOTSTRAP_CODE
    }

    /// Whether the code can double as a storage key (file name, row key).
    ///
    /// Generated and bootstrap codes always are; arbitrary caller input may not be.
    pub fn is_key_safe(&self) -> bool {
        self.0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Form suitable for logs.
    pub fn redacted(&self) -> String {
        let head: String = self.0.chars().take(4).collect();
        format!("{head}…")
    }
}

impl core::fmt::Display for InvitationCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_codes_are_long_unique_and_key_safe() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let code = InvitationCode::generate();
            assert!(code.as_str().len() >= MIN_CODE_LEN);
            assert!(code.is_key_safe());
            assert!(seen.insert(code), "duplicate code generated");
        }
    }

    #[test]
    fn parse_rejects_blank_and_short_codes() {
        assert!(InvitationCode::parse("").is_err());
        assert!(InvitationCode::parse("          ").is_err());
        assert!(InvitationCode::parse("abc123").is_err());
        assert!(InvitationCode::parse("abcdefghij").is_ok());
    }

    #[test]
    fn bootstrap_code_is_valid_input() {
        let parsed = InvitationCode::parse(BOOTSTRAP_CODE).unwrap();
        assert!(parsed.is_bootstrap());
        assert!(parsed.is_key_safe());
    }

    #[test]
    fn path_like_input_is_not_key_safe() {
        let code = InvitationCode::parse("../../etc/passwd").unwrap();
        assert!(!code.is_key_safe());
    }

    #[test]
    fn redaction_keeps_only_a_prefix() {
        let code = InvitationCode::parse("abcdefghijklmnop").unwrap();
        assert_eq!(code.redacted(), "abcd…");
    }
}
