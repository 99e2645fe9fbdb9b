//! `delegate-auth`: pure authorization boundary for delegated user management.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthzError, ManagementScope, Scoped, ensure_can_assign, ensure_in_scope, ensure_not_self,
    ensure_outranks, filter_visible, management_scope,
};
pub use claims::{AdminClaims, Hs256JwtValidator, JwtValidator, TokenValidationError, validate_claims};
pub use permissions::Permissions;
pub use principal::{DirectoryUser, Principal, UserPatch};
pub use roles::DelegatedRole;
