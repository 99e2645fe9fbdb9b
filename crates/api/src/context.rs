use delegate_auth::{Permissions, Principal};

/// Principal context for an administrative request (identity, company, role),
/// derived from the bearer token by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn permissions(&self) -> Permissions {
        self.principal.permissions()
    }
}
