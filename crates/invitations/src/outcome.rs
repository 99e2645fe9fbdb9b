use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{InvitationCode, InvitationRecord};

/// Why a submitted code cannot be used.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum InvalidReason {
    /// Empty or shorter than the minimum length.
    Malformed,
    /// No such code (never issued, already redeemed, or deleted).
    NotFound,
    Expired,
}

impl InvalidReason {
    pub fn as_str(self) -> &'static str {
        match self {
            InvalidReason::Malformed => "Invalid",
            InvalidReason::NotFound => "NotFound",
            InvalidReason::Expired => "Expired",
        }
    }
}

impl core::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of validating (or redeeming) a submitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid(InvitationRecord),
    Invalid(InvalidReason),
}

impl Validation {
    /// Classify a raw submitted code before it reaches storage.
    pub fn parse_code(raw: &str) -> Result<InvitationCode, InvalidReason> {
        InvitationCode::parse(raw).map_err(|_| InvalidReason::Malformed)
    }

    /// Classify a lookup result.
    pub fn from_lookup(found: Option<InvitationRecord>, now: DateTime<Utc>) -> Self {
        match found {
            None => Validation::Invalid(InvalidReason::NotFound),
            Some(record) if record.is_expired(now) => Validation::Invalid(InvalidReason::Expired),
            Some(record) => Validation::Valid(record),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn lookup_classification() {
        let now = Utc::now();
        assert_eq!(
            Validation::from_lookup(None, now),
            Validation::Invalid(InvalidReason::NotFound)
        );

        let mut record = InvitationRecord::bootstrap(now);
        assert!(Validation::from_lookup(Some(record.clone()), now).is_valid());

        record.expires_at = now - Duration::seconds(1);
        assert_eq!(
            Validation::from_lookup(Some(record), now),
            Validation::Invalid(InvalidReason::Expired)
        );
    }

    #[test]
    fn short_codes_are_malformed() {
        assert_eq!(Validation::parse_code("short"), Err(InvalidReason::Malformed));
        assert_eq!(Validation::parse_code("   "), Err(InvalidReason::Malformed));
        assert!(Validation::parse_code("long-enough-code").is_ok());
    }
}
