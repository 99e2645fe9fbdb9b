//! Infrastructure layer: invitation storage, directory access, services, config.

pub mod config;
pub mod directory;
pub mod invitation_service;
pub mod invitation_store;
pub mod role_resolver;
pub mod user_admin;

mod integration_tests;

pub use config::{AppConfig, AttributeNames, ConfigError, StoreConfig};
pub use invitation_service::{InvitationService, InvitationServiceError};
pub use role_resolver::{RoleResolutionError, RoleResolver};
pub use user_admin::{UserAdminError, UserAdminService};
