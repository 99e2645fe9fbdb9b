use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_invitations).post(create_invitation))
        .route("/:code", delete(delete_invitation))
}

/// GET /admin/invitations?companyId= - pending invitations visible to the caller
pub async fn list_invitations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListInvitationsQuery>,
) -> axum::response::Response {
    let company = query.company();
    match services
        .invitations
        .list_pending(principal.principal(), company.as_ref())
        .await
    {
        Ok(invitations) => Json(dto::InvitationList { invitations }).into_response(),
        Err(e) => errors::invitation_error_to_response(e),
    }
}

/// POST /admin/invitations - issue a new invitation
pub async fn create_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateInvitationRequest>,
) -> axum::response::Response {
    let cmd = match body.into_command() {
        Ok(cmd) => cmd,
        Err(resp) => return resp,
    };

    match services.invitations.issue(principal.principal(), &cmd).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => errors::invitation_error_to_response(e),
    }
}

/// DELETE /admin/invitations/:code - cancel an invitation
pub async fn delete_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(code): Path<String>,
) -> axum::response::Response {
    match services.invitations.delete(&code, principal.principal()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::invitation_error_to_response(e),
    }
}
