use axum::{Router, routing::get};

use crate::app::services::CallbackSettings;

pub mod connector;
pub mod invitations;
pub mod system;
pub mod users;

/// Router for the authenticated administrative endpoints (mounted under `/admin`).
pub fn admin_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/invitations", invitations::router())
        .nest("/users", users::router())
}

/// Router for the unauthenticated endpoints: health, bootstrap and the platform callbacks.
pub fn public_router(settings: &CallbackSettings) -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/bootstrap", get(system::bootstrap))
        .merge(connector::router(settings))
}
