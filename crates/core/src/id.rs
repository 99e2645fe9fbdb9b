//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are owned by the external directory (object ids, application
//! client ids) or chosen by administrators (company ids), so they are opaque
//! strings rather than locally generated UUIDs.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a directory principal (the directory's object id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

/// Identifier of a company scope. Invitations and users without one are global.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(String);

/// Client id of an application registered in the directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Build an identifier from a trusted value (no validation).
            ///
            /// Prefer `parse` for anything that crossed a process boundary.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Parse an identifier, trimming surrounding whitespace.
            pub fn parse(value: &str) -> Result<Self, DomainError> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: empty", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

impl_string_newtype!(PrincipalId, "PrincipalId");
impl_string_newtype!(CompanyId, "CompanyId");
impl_string_newtype!(AppId, "AppId");

impl CompanyId {
    /// Company ids compare case-insensitively, matching how the directory filters them.
    pub fn matches(&self, other: &CompanyId) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}
