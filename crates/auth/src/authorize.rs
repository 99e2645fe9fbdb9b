use thiserror::Error;

use delegate_core::{CompanyId, PrincipalId};

use crate::{DelegatedRole, DirectoryUser, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: caller cannot manage users or invitations")]
    NotManager,

    #[error("forbidden: company admin has no company")]
    MissingCompany,

    #[error("forbidden: resource belongs to a different company")]
    ScopeMismatch,

    #[error("forbidden: caller cannot assign role '{0}'")]
    RoleNotAssignable(DelegatedRole),

    #[error("forbidden: caller cannot move users between companies")]
    CompanyNotSelectable,

    #[error("forbidden: principals cannot modify their own account")]
    SelfModification,

    #[error("forbidden: target holds role '{0}', which outranks the caller")]
    Outranked(DelegatedRole),
}

/// Anything that belongs to a company scope (`None` = global).
pub trait Scoped {
    fn company_id(&self) -> Option<&CompanyId>;
}

impl Scoped for DirectoryUser {
    fn company_id(&self) -> Option<&CompanyId> {
        self.company_id.as_ref()
    }
}

/// The set of records an administrator is allowed to see and mutate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagementScope {
    Global,
    Company(CompanyId),
}

impl ManagementScope {
    /// Filter to hand to stores/directories (`None` = everything).
    pub fn company_filter(&self) -> Option<&CompanyId> {
        match self {
            ManagementScope::Global => None,
            ManagementScope::Company(company) => Some(company),
        }
    }

    pub fn covers(&self, company: Option<&CompanyId>) -> bool {
        match (self, company) {
            (ManagementScope::Global, _) => true,
            (ManagementScope::Company(own), Some(other)) => own.matches(other),
            (ManagementScope::Company(_), None) => false,
        }
    }
}

/// Resolve what the caller may manage.
///
/// - No IO
/// - No panics
/// - Pure policy: GlobalAdmin manages everything, CompanyAdmin their own company.
pub fn management_scope(principal: &Principal) -> Result<ManagementScope, AuthzError> {
    match principal.role {
        Some(DelegatedRole::GlobalAdmin) => Ok(ManagementScope::Global),
        Some(DelegatedRole::CompanyAdmin) => principal
            .company_id
            .clone()
            .map(ManagementScope::Company)
            .ok_or(AuthzError::MissingCompany),
        Some(DelegatedRole::CompanyUser) | None => Err(AuthzError::NotManager),
    }
}

/// Keep only the records the caller may see. Non-managers see nothing.
pub fn filter_visible<T: Scoped>(records: Vec<T>, principal: &Principal) -> Vec<T> {
    match management_scope(principal) {
        Ok(scope) => records
            .into_iter()
            .filter(|r| scope.covers(r.company_id()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Require that the caller manages the scope `resource` lives in.
pub fn ensure_in_scope<T: Scoped + ?Sized>(
    principal: &Principal,
    resource: &T,
) -> Result<ManagementScope, AuthzError> {
    let scope = management_scope(principal)?;
    if scope.covers(resource.company_id()) {
        Ok(scope)
    } else {
        Err(AuthzError::ScopeMismatch)
    }
}

/// Guard against administrators locking themselves out.
pub fn ensure_not_self(principal: &Principal, target: &PrincipalId) -> Result<(), AuthzError> {
    if &principal.id == target {
        Err(AuthzError::SelfModification)
    } else {
        Ok(())
    }
}

/// Require that the caller may hand out `role`.
pub fn ensure_can_assign(principal: &Principal, role: DelegatedRole) -> Result<(), AuthzError> {
    let scope = management_scope(principal)?;
    match (scope, role) {
        (ManagementScope::Company(_), DelegatedRole::GlobalAdmin) => {
            Err(AuthzError::RoleNotAssignable(role))
        }
        _ => Ok(()),
    }
}

/// Require that the caller ranks at least as high as the user or invitation they act on.
pub fn ensure_outranks(principal: &Principal, target: Option<DelegatedRole>) -> Result<(), AuthzError> {
    management_scope(principal)?;
    match (principal.role, target) {
        (Some(own), Some(target)) if !own.includes(target) => Err(AuthzError::Outranked(target)),
        _ => Ok(()),
    }
}
