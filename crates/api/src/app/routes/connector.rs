//! Callback endpoints invoked by the identity platform during sign-up and sign-in.

use std::any::Any;
use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::Extension,
    response::{IntoResponse, Response},
    routing::post,
};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};

use delegate_core::{AppId, PrincipalId};
use delegate_invitations::{InvalidReason, InvitationCode, Validation};

use crate::app::services::{AppServices, CallbackSettings};
use crate::connector::{self, ConnectorResponse};

pub const FIELD_OBJECT_ID: &str = "objectId";
pub const FIELD_CLIENT_ID: &str = "client_id";

/// Callback routes plus the legacy controller-style aliases.
///
/// A panicking handler still answers in the callback shape.
pub fn router(settings: &CallbackSettings) -> Router {
    let role_attribute = settings.role_attribute.clone();
    let roles = Router::new()
        .route("/roles-resolve", post(resolve_roles))
        .route("/api/approles/getapproles", post(resolve_roles))
        .layer(CatchPanicLayer::custom(
            move |_: Box<dyn Any + Send + 'static>| {
                error!("panic while resolving app roles");
                connector::roles_failed(&role_attribute).into_response()
            },
        ));

    let names = settings.redeem_claims.clone();
    let redeem = Router::new()
        .route("/invitation-redeem", post(redeem_invitation))
        .route("/api/userinvitation/redeem", post(redeem_invitation))
        .layer(CatchPanicLayer::custom(
            move |_: Box<dyn Any + Send + 'static>| {
                error!("panic while redeeming an invitation");
                connector::redemption_failed(&names).into_response()
            },
        ));

    roles.merge(redeem)
}

fn field_names(payload: &serde_json::Map<String, serde_json::Value>) -> Vec<&str> {
    payload.keys().map(String::as_str).collect()
}

/// POST /roles-resolve `{objectId, client_id}`
pub async fn resolve_roles(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> Response {
    let attr = services.callback.role_attribute.as_str();
    resolve_roles_inner(&services, attr, &body).await.into_response()
}

async fn resolve_roles_inner(services: &AppServices, attr: &str, body: &[u8]) -> ConnectorResponse {
    let payload = match connector::parse_payload(body) {
        Ok(payload) => payload,
        Err(reason) => {
            warn!(%reason, "rejected app roles request");
            return connector::roles_invalid_input(attr);
        }
    };
    info!(fields = ?field_names(&payload), "app roles requested");

    let user = connector::string_field(&payload, FIELD_OBJECT_ID).and_then(|v| PrincipalId::parse(v).ok());
    let app = connector::string_field(&payload, FIELD_CLIENT_ID).and_then(|v| AppId::parse(v).ok());
    let (Some(user), Some(app)) = (user, app) else {
        warn!("app roles request is missing objectId or client_id");
        return connector::roles_invalid_input(attr);
    };

    match services.roles.resolve(&user, &app).await {
        Ok(roles) => {
            info!(user = %user, app_id = %app, count = roles.len(), "app roles determined");
            connector::roles_response(attr, &roles)
        }
        Err(e) => {
            error!(user = %user, app_id = %app, error = %e, "could not determine app roles");
            connector::roles_failed(attr)
        }
    }
}

/// POST /invitation-redeem `{..., extension_<prefix>_InvitationCode}`
pub async fn redeem_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> Response {
    redeem_invitation_inner(&services, &body).await.into_response()
}

async fn redeem_invitation_inner(services: &AppServices, body: &[u8]) -> ConnectorResponse {
    let settings = &services.callback;
    let names = &settings.redeem_claims;

    let payload = match connector::parse_payload(body) {
        Ok(payload) => payload,
        Err(reason) => {
            warn!(%reason, "rejected invitation redemption request");
            return connector::redemption_response(&Validation::Invalid(InvalidReason::Malformed), names);
        }
    };
    info!(fields = ?field_names(&payload), "invitation redemption requested");

    let raw = connector::string_field(&payload, &settings.invitation_code_field).unwrap_or_default();
    let shown = InvitationCode::parse(raw)
        .map(|c| c.redacted())
        .unwrap_or_else(|_| "<malformed>".to_string());

    match services.invitations.redeem(raw).await {
        Ok(outcome) => {
            let response = connector::redemption_response(&outcome, names);
            info!(code = %shown, outcome = response.code, "invitation redemption handled");
            response
        }
        Err(e) => {
            error!(code = %shown, error = %e, "invitation store failure during redemption");
            connector::redemption_failed(names)
        }
    }
}
