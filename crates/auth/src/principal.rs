use serde::{Deserialize, Serialize};

use delegate_core::{CompanyId, PrincipalId};

use crate::{DelegatedRole, Permissions};

/// The signed-in caller of the administrative surface, as asserted by their token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub company_id: Option<CompanyId>,
    pub role: Option<DelegatedRole>,
}

impl Principal {
    pub fn new(id: PrincipalId, company_id: Option<CompanyId>, role: Option<DelegatedRole>) -> Self {
        Self { id, company_id, role }
    }

    pub fn permissions(&self) -> Permissions {
        Permissions::for_role(self.role)
    }
}

/// A user record owned by the external directory.
///
/// The core reads and writes these through the directory capability and never
/// caches them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: PrincipalId,
    pub display_name: String,
    pub company_id: Option<CompanyId>,
    pub role: Option<DelegatedRole>,
    pub invitation_code: Option<String>,
}

impl DirectoryUser {
    /// Only users that carry at least one custom attribute were provisioned
    /// through a sign-up flow; the rest are directory plumbing accounts.
    pub fn has_custom_attributes(&self) -> bool {
        self.company_id.is_some() || self.role.is_some() || self.invitation_code.is_some()
    }
}

/// Partial update of a directory user. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub company_id: Option<CompanyId>,
    pub role: Option<DelegatedRole>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.company_id.is_none() && self.role.is_none()
    }

    pub fn apply_to(&self, user: &mut DirectoryUser) {
        if let Some(name) = &self.display_name {
            user.display_name = name.clone();
        }
        if let Some(company) = &self.company_id {
            user.company_id = Some(company.clone());
        }
        if let Some(role) = self.role {
            user.role = Some(role);
        }
    }
}
