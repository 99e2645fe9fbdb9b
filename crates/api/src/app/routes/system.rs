use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /admin/whoami
pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    let p = principal.principal();
    Json(dto::WhoAmIResponse {
        id: p.id.clone(),
        company_id: p.company_id.clone(),
        role: p.role,
        permissions: principal.permissions(),
    })
}

/// GET /bootstrap - the first-administrator invitation, while nobody has signed up yet
pub async fn bootstrap(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.invitations.ensure_bootstrap().await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "the directory already has users; ask an administrator for an invitation",
        ),
        Err(e) => errors::invitation_error_to_response(e),
    }
}
