use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use delegate_core::{CompanyId, PrincipalId};

use crate::{DelegatedRole, Principal};

/// Bearer claims for the administrative surface.
///
/// Aliases accept the attribute-style claim names the identity platform emits
/// (`oid`, `extension_CompanyId`, `extension_DelegatedUserManagementRole`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Subject / principal identifier.
    #[serde(alias = "oid")]
    pub sub: PrincipalId,

    #[serde(default, alias = "extension_CompanyId")]
    pub company_id: Option<CompanyId>,

    /// Unknown role names degrade to "no role" instead of rejecting the token.
    #[serde(
        default,
        alias = "extension_DelegatedUserManagementRole",
        deserialize_with = "lenient_role"
    )]
    pub role: Option<DelegatedRole>,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AdminClaims {
    pub fn principal(&self) -> Principal {
        Principal::new(self.sub.clone(), self.company_id.clone(), self.role)
    }
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<DelegatedRole>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| r.parse().ok()))
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate the time window of decoded claims.
pub fn validate_claims(claims: &AdminClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Decodes and verifies a bearer token into claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<AdminClaims, TokenValidationError>;
}

/// HMAC-SHA256 validator for tokens minted by a trusted front end.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks run in `validate_claims` against the injected `now`.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<AdminClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<AdminClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
