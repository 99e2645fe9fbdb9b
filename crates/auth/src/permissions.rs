use serde::Serialize;

use crate::DelegatedRole;

/// What the administrative surface lets a caller do.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    /// May list, create and delete invitations and users.
    pub can_manage: bool,
    /// May issue or assign the `GlobalAdmin` role.
    pub can_assign_global_admin: bool,
    /// May choose the company of an invitation or user (otherwise forced to their own).
    pub can_select_company: bool,
}

impl Permissions {
    pub const NONE: Permissions = Permissions {
        can_manage: false,
        can_assign_global_admin: false,
        can_select_company: false,
    };

    /// Permission table for a caller's role (`None` = no role attribute).
    pub fn for_role(role: Option<DelegatedRole>) -> Self {
        match role {
            Some(DelegatedRole::GlobalAdmin) => Permissions {
                can_manage: true,
                can_assign_global_admin: true,
                can_select_company: true,
            },
            Some(DelegatedRole::CompanyAdmin) => Permissions {
                can_manage: true,
                can_assign_global_admin: false,
                can_select_company: false,
            },
            Some(DelegatedRole::CompanyUser) | None => Self::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_roles() {
        let global = Permissions::for_role(Some(DelegatedRole::GlobalAdmin));
        assert!(global.can_manage && global.can_assign_global_admin && global.can_select_company);

        let company = Permissions::for_role(Some(DelegatedRole::CompanyAdmin));
        assert!(company.can_manage);
        assert!(!company.can_assign_global_admin && !company.can_select_company);

        assert_eq!(Permissions::for_role(Some(DelegatedRole::CompanyUser)), Permissions::NONE);
        assert_eq!(Permissions::for_role(None), Permissions::NONE);
    }
}
