use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use delegate_infra::{InvitationServiceError, UserAdminError};

pub fn invitation_error_to_response(err: InvitationServiceError) -> axum::response::Response {
    match err {
        InvitationServiceError::Unauthorized(e) => {
            json_error(StatusCode::FORBIDDEN, "unauthorized", e.to_string())
        }
        InvitationServiceError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        InvitationServiceError::Store(e) => {
            error!(error = %e, "invitation store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "invitation storage is unavailable")
        }
        InvitationServiceError::Directory(e) => {
            error!(error = %e, "directory failure");
            json_error(StatusCode::BAD_GATEWAY, "directory_error", "the user directory is unavailable")
        }
        InvitationServiceError::CodeExhausted => {
            error!("could not allocate a unique invitation code");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "please try again")
        }
    }
}

pub fn user_admin_error_to_response(err: UserAdminError) -> axum::response::Response {
    match err {
        UserAdminError::Unauthorized(e) => json_error(StatusCode::FORBIDDEN, "unauthorized", e.to_string()),
        UserAdminError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        UserAdminError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        UserAdminError::Directory(e) => {
            error!(error = %e, "directory failure");
            json_error(StatusCode::BAD_GATEWAY, "directory_error", "the user directory is unavailable")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}
