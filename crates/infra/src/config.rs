//! Configuration loading and representation.
//!
//! Built once at startup and handed to constructors; nothing reads the
//! environment after that.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use delegate_observability::LogFormat;

pub const ENV_BIND_ADDR: &str = "DELEGATE_BIND_ADDR";
pub const ENV_JWT_SECRET: &str = "DELEGATE_JWT_SECRET";
pub const ENV_EXTENSIONS_APP_ID: &str = "DELEGATE_EXTENSIONS_APP_ID";
pub const ENV_ROLE_ATTRIBUTE: &str = "DELEGATE_ROLE_ATTRIBUTE";
pub const ENV_STORE: &str = "DELEGATE_STORE";
pub const ENV_LOG_FORMAT: &str = "DELEGATE_LOG_FORMAT";
pub const ENV_DIRECTORY_SEED: &str = "DELEGATE_DIRECTORY_SEED";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STORE: &str = "file:./user-invitations";
const DEV_JWT_SECRET: &str = "delegate-dev-secret-change-me";
const DEV_EXTENSIONS_APP_ID: &str = "00000000000000000000000000000000";

/// Custom user attributes this service reads and writes.
pub const ATTR_INVITATION_CODE: &str = "InvitationCode";
pub const ATTR_COMPANY_ID: &str = "CompanyId";
pub const ATTR_DELEGATED_ROLE: &str = "DelegatedUserManagementRole";

pub const DEFAULT_ROLE_ATTRIBUTE: &str = "extension_AppRoles";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Where invitation records live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    /// One JSON document per code in this directory.
    File(PathBuf),
    /// Postgres connection URL.
    Postgres(String),
}

impl StoreConfig {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("memory") {
            return Ok(StoreConfig::Memory);
        }
        if let Some(dir) = raw.strip_prefix("file:") {
            if dir.is_empty() {
                return Err(ConfigError::invalid(ENV_STORE, raw, "missing directory"));
            }
            return Ok(StoreConfig::File(PathBuf::from(dir)));
        }
        if let Some(url) = raw.strip_prefix("postgres:") {
            if url.is_empty() {
                return Err(ConfigError::invalid(ENV_STORE, raw, "missing connection url"));
            }
            return Ok(StoreConfig::Postgres(url.to_string()));
        }
        Err(ConfigError::invalid(
            ENV_STORE,
            raw,
            "expected 'memory', 'file:<dir>' or 'postgres:<url>'",
        ))
    }
}

/// Attribute naming used by the identity platform.
///
/// Custom attribute `X` is `extension_<prefix>_X` on directory objects and in
/// callback payloads, and `extension_X` in issued tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeNames {
    prefix: String,
}

impl AttributeNames {
    /// `extensions_app_id` is the client id of the platform's extensions application.
    pub fn new(extensions_app_id: &str) -> Self {
        Self {
            prefix: extensions_app_id.trim().replace('-', ""),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn extension_name(&self, attribute: &str) -> String {
        format!("extension_{}_{attribute}", self.prefix)
    }

    /// Field of the redeem callback payload that carries the code.
    pub fn invitation_code_field(&self) -> String {
        self.extension_name(ATTR_INVITATION_CODE)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: Vec<u8>,
    pub attributes: AttributeNames,
    /// Response attribute carrying resolved app roles.
    pub role_attribute: String,
    pub store: StoreConfig,
    pub log_format: LogFormat,
    pub directory_seed: Option<PathBuf>,
    insecure_defaults: Vec<&'static str>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut insecure_defaults = Vec::new();

        let bind_raw = get(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid(ENV_BIND_ADDR, &bind_raw, e.to_string()))?;

        let jwt_secret = match get(ENV_JWT_SECRET) {
            Some(secret) => secret.into_bytes(),
            None => {
                insecure_defaults.push(ENV_JWT_SECRET);
                DEV_JWT_SECRET.as_bytes().to_vec()
            }
        };

        let app_id = match get(ENV_EXTENSIONS_APP_ID) {
            Some(id) => id,
            None => {
                insecure_defaults.push(ENV_EXTENSIONS_APP_ID);
                DEV_EXTENSIONS_APP_ID.to_string()
            }
        };
        let attributes = AttributeNames::new(&app_id);
        if !attributes
            .prefix()
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::invalid(
                ENV_EXTENSIONS_APP_ID,
                &app_id,
                "expected a client id (hex digits and dashes)",
            ));
        }

        let role_attribute = get(ENV_ROLE_ATTRIBUTE)
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_ROLE_ATTRIBUTE.to_string());

        let store = StoreConfig::parse(&get(ENV_STORE).unwrap_or_else(|| DEFAULT_STORE.to_string()))?;

        let log_format = match get(ENV_LOG_FORMAT) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid(ENV_LOG_FORMAT, &raw, e.to_string()))?,
            None => LogFormat::default(),
        };

        let directory_seed = get(ENV_DIRECTORY_SEED).map(PathBuf::from);

        Ok(Self {
            bind_addr,
            jwt_secret,
            attributes,
            role_attribute,
            store,
            log_format,
            directory_seed,
            insecure_defaults,
        })
    }

    /// Variables that fell back to development defaults; callers should warn about these.
    pub fn insecure_defaults(&self) -> &[&'static str] {
        &self.insecure_defaults
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_are_usable_but_flagged() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.store, StoreConfig::File(PathBuf::from("./user-invitations")));
        assert_eq!(cfg.role_attribute, "extension_AppRoles");
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.insecure_defaults(), &[ENV_JWT_SECRET, ENV_EXTENSIONS_APP_ID]);
    }

    #[test]
    fn attribute_names_strip_dashes_from_the_app_id() {
        let cfg = config(&[
            (ENV_EXTENSIONS_APP_ID, "b5e3a1c2-0000-4d6e-9f10-123456789abc"),
            (ENV_JWT_SECRET, "s3cret"),
        ])
        .unwrap();
        assert!(cfg.insecure_defaults().is_empty());
        assert_eq!(
            cfg.attributes.invitation_code_field(),
            "extension_b5e3a1c200004d6e9f10123456789abc_InvitationCode"
        );
    }

    #[test]
    fn store_variants_parse() {
        assert_eq!(StoreConfig::parse("memory"), Ok(StoreConfig::Memory));
        assert_eq!(
            StoreConfig::parse("postgres:postgres://localhost/delegate"),
            Ok(StoreConfig::Postgres("postgres://localhost/delegate".to_string()))
        );
        assert!(StoreConfig::parse("file:").is_err());
        assert!(StoreConfig::parse("s3://bucket").is_err());
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config(&[(ENV_BIND_ADDR, "not-an-addr")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_BIND_ADDR, .. }));

        let err = config(&[(ENV_LOG_FORMAT, "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_LOG_FORMAT, .. }));

        let err = config(&[(ENV_EXTENSIONS_APP_ID, "bad/app id")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_EXTENSIONS_APP_ID, .. }));
    }
}
