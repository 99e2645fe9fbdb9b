use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use delegate_core::PrincipalId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", axum::routing::patch(update_user).delete(delete_user))
}

fn parse_id(raw: &str) -> Result<PrincipalId, axum::response::Response> {
    PrincipalId::parse(raw).map_err(|e| errors::bad_request(e.to_string()))
}

/// GET /admin/users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.users.list_users(principal.principal()).await {
        Ok(users) => Json(dto::UserList { users }).into_response(),
        Err(e) => errors::user_admin_error_to_response(e),
    }
}

/// PATCH /admin/users/:id
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserRequest>,
) -> axum::response::Response {
    let (id, patch) = match (parse_id(&id), body.into_patch()) {
        (Ok(id), Ok(patch)) => (id, patch),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services.users.update_user(principal.principal(), &id, &patch).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => errors::user_admin_error_to_response(e),
    }
}

/// DELETE /admin/users/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.users.delete_user(principal.principal(), &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::user_admin_error_to_response(e),
    }
}
