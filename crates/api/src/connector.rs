//! Callback protocol of the identity platform's API connectors.
//!
//! Every callback ends in exactly one of three actions:
//!
//! | action | transport status | body `status` |
//! |--------|------------------|---------------|
//! | `Continue` | 200 | absent |
//! | `ValidationError` | 400 | `"400"` |
//! | `ShowBlockPage` | 200 | absent |
//!
//! The platform renders a block page only for a 200 whose action says so, which
//! is why server faults are reported with a success status.

use std::collections::BTreeSet;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

use delegate_invitations::{InvalidReason, InvitationRecord, Validation};

/// Contract version echoed in every response.
pub const API_VERSION: &str = "1.0.0";

pub mod codes {
    pub const ROLES_SUCCEEDED: &str = "GetAppRoles-Succeeded";
    pub const ROLES_INVALID_INPUT: &str = "GetAppRoles-InvalidInput";
    pub const ROLES_INTERNAL_ERROR: &str = "GetAppRoles-InternalError";
    pub const REDEEM_SUCCEEDED: &str = "UserInvitationRedemptionSucceeded";
    pub const REDEEM_INVALID: &str = "UserInvitationRedemptionFailed-Invalid";
    pub const REDEEM_NOT_FOUND: &str = "UserInvitationRedemptionFailed-NotFound";
    pub const REDEEM_EXPIRED: &str = "UserInvitationRedemptionFailed-Expired";
    pub const REDEEM_INTERNAL_ERROR: &str = "UserInvitationRedemptionFailed-InternalError";
}

pub mod messages {
    pub const ROLES_SUCCEEDED: &str = "Your app roles were successfully determined.";
    pub const ROLES_INVALID_INPUT: &str = "Your sign-in request could not be processed.";
    pub const ROLES_INTERNAL_ERROR: &str =
        "An error occurred while determining your app roles, please try again later.";
    pub const CODE_VALID: &str = "The invitation code you provided is valid.";
    pub const CODE_INVALID: &str = "The invitation code you provided is invalid.";
    pub const CODE_EXPIRED: &str = "The invitation code you provided has expired.";
    pub const REDEEM_INTERNAL_ERROR: &str =
        "An error occurred while validating your invitation code, please try again later.";
    pub const UNEXPECTED: &str = "An unexpected error occurred, please try again later.";
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ConnectorAction {
    Continue,
    ValidationError,
    ShowBlockPage,
}

impl ConnectorAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorAction::Continue => "Continue",
            ConnectorAction::ValidationError => "ValidationError",
            ConnectorAction::ShowBlockPage => "ShowBlockPage",
        }
    }
}

/// A response in the platform's fixed callback shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorResponse {
    pub action: ConnectorAction,
    pub code: &'static str,
    pub user_message: &'static str,
    /// Attribute values handed back to the platform (`null` clears/omits the claim).
    pub claims: Map<String, Value>,
}

impl ConnectorResponse {
    fn new(action: ConnectorAction, code: &'static str, user_message: &'static str) -> Self {
        Self {
            action,
            code,
            user_message,
            claims: Map::new(),
        }
    }

    pub fn proceed(code: &'static str, user_message: &'static str) -> Self {
        Self::new(ConnectorAction::Continue, code, user_message)
    }

    pub fn validation_error(code: &'static str, user_message: &'static str) -> Self {
        Self::new(ConnectorAction::ValidationError, code, user_message)
    }

    pub fn block_page(code: &'static str, user_message: &'static str) -> Self {
        Self::new(ConnectorAction::ShowBlockPage, code, user_message)
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: Value) -> Self {
        self.claims.insert(name.into(), value);
        self
    }

    pub fn transport_status(&self) -> StatusCode {
        match self.action {
            ConnectorAction::ValidationError => StatusCode::BAD_REQUEST,
            ConnectorAction::Continue | ConnectorAction::ShowBlockPage => StatusCode::OK,
        }
    }

    pub fn body(&self) -> Value {
        let mut body = self.claims.clone();
        body.insert("version".into(), Value::from(API_VERSION));
        body.insert("action".into(), Value::from(self.action.as_str()));
        body.insert("code".into(), Value::from(self.code));
        body.insert("userMessage".into(), Value::from(self.user_message));

        let status = self.transport_status();
        if status != StatusCode::OK {
            body.insert("status".into(), Value::from(status.as_u16().to_string()));
        }
        Value::Object(body)
    }
}

impl IntoResponse for ConnectorResponse {
    fn into_response(self) -> Response {
        (self.transport_status(), Json(self.body())).into_response()
    }
}

/// Attribute names used in redemption responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemClaimNames {
    pub company_id: String,
    pub role: String,
}

/// Translate a redemption outcome into the callback response.
pub fn redemption_response(outcome: &Validation, names: &RedeemClaimNames) -> ConnectorResponse {
    let response = match outcome {
        Validation::Valid(_) => ConnectorResponse::proceed(codes::REDEEM_SUCCEEDED, messages::CODE_VALID),
        Validation::Invalid(InvalidReason::Malformed) => {
            ConnectorResponse::validation_error(codes::REDEEM_INVALID, messages::CODE_INVALID)
        }
        Validation::Invalid(InvalidReason::NotFound) => {
            ConnectorResponse::validation_error(codes::REDEEM_NOT_FOUND, messages::CODE_INVALID)
        }
        Validation::Invalid(InvalidReason::Expired) => {
            ConnectorResponse::validation_error(codes::REDEEM_EXPIRED, messages::CODE_EXPIRED)
        }
    };

    let record: Option<&InvitationRecord> = match outcome {
        Validation::Valid(record) => Some(record),
        Validation::Invalid(_) => None,
    };
    response
        .with_claim(
            names.company_id.clone(),
            record
                .and_then(|r| r.company_id.as_ref())
                .map_or(Value::Null, |c| Value::from(c.as_str())),
        )
        .with_claim(
            names.role.clone(),
            record.map_or(Value::Null, |r| Value::from(r.role.as_str())),
        )
}

pub fn redemption_failed(names: &RedeemClaimNames) -> ConnectorResponse {
    ConnectorResponse::block_page(codes::REDEEM_INTERNAL_ERROR, messages::REDEEM_INTERNAL_ERROR)
        .with_claim(names.company_id.clone(), Value::Null)
        .with_claim(names.role.clone(), Value::Null)
}

pub fn roles_response(role_attribute: &str, roles: &BTreeSet<String>) -> ConnectorResponse {
    ConnectorResponse::proceed(codes::ROLES_SUCCEEDED, messages::ROLES_SUCCEEDED)
        .with_claim(role_attribute, encode_multi_valued(roles))
}

pub fn roles_invalid_input(role_attribute: &str) -> ConnectorResponse {
    ConnectorResponse::validation_error(codes::ROLES_INVALID_INPUT, messages::ROLES_INVALID_INPUT)
        .with_claim(role_attribute, Value::Null)
}

pub fn roles_failed(role_attribute: &str) -> ConnectorResponse {
    ConnectorResponse::block_page(codes::ROLES_INTERNAL_ERROR, messages::ROLES_INTERNAL_ERROR)
        .with_claim(role_attribute, Value::Null)
}

/// The attribute store holds single strings only: join with spaces, `null` when empty.
pub fn encode_multi_valued(values: &BTreeSet<String>) -> Value {
    if values.is_empty() {
        Value::Null
    } else {
        Value::from(values.iter().map(String::as_str).collect::<Vec<_>>().join(" "))
    }
}

/// Inverse of `encode_multi_valued`; tolerant of repeated whitespace and duplicates.
pub fn decode_multi_valued(raw: &str) -> BTreeSet<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Parse a callback body. The platform always sends a JSON object.
pub fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, String> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err("request body is not a JSON object".to_string()),
        Err(e) => Err(format!("request body is not valid JSON: {e}")),
    }
}

/// Look a field up ignoring ASCII case (the platform may vary the casing of extension names).
pub fn find_field<'a>(payload: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    payload
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

pub fn string_field<'a>(payload: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    find_field(payload, name).and_then(Value::as_str)
}
