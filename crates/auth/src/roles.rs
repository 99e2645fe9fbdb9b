use core::str::FromStr;

use serde::{Deserialize, Serialize};

use delegate_core::DomainError;

/// Delegated user-management role carried as a custom user attribute.
///
/// Privilege is totally ordered: `GlobalAdmin ⊇ CompanyAdmin ⊇ CompanyUser`.
/// The derived `Ord` follows declaration order, so lower sorts first for display
/// and `privilege()` is used for comparisons.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DelegatedRole {
    CompanyAdmin,
    CompanyUser,
    GlobalAdmin,
}

impl DelegatedRole {
    pub const ALL: [DelegatedRole; 3] = [
        DelegatedRole::GlobalAdmin,
        DelegatedRole::CompanyAdmin,
        DelegatedRole::CompanyUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DelegatedRole::GlobalAdmin => "GlobalAdmin",
            DelegatedRole::CompanyAdmin => "CompanyAdmin",
            DelegatedRole::CompanyUser => "CompanyUser",
        }
    }

    fn privilege(&self) -> u8 {
        match self {
            DelegatedRole::GlobalAdmin => 2,
            DelegatedRole::CompanyAdmin => 1,
            DelegatedRole::CompanyUser => 0,
        }
    }

    /// Whether this role grants at least everything `other` grants.
    pub fn includes(&self, other: DelegatedRole) -> bool {
        self.privilege() >= other.privilege()
    }
}

impl core::fmt::Display for DelegatedRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DelegatedRole {
    type Err = DomainError;

    /// Role names from the directory are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        DelegatedRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DomainError::validation(format!("unknown role '{trimmed}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("globaladmin".parse::<DelegatedRole>().unwrap(), DelegatedRole::GlobalAdmin);
        assert_eq!(" CompanyUser ".parse::<DelegatedRole>().unwrap(), DelegatedRole::CompanyUser);
        assert!("Owner".parse::<DelegatedRole>().is_err());
    }

    #[test]
    fn privilege_is_a_chain() {
        assert!(DelegatedRole::GlobalAdmin.includes(DelegatedRole::CompanyAdmin));
        assert!(DelegatedRole::CompanyAdmin.includes(DelegatedRole::CompanyUser));
        assert!(!DelegatedRole::CompanyAdmin.includes(DelegatedRole::GlobalAdmin));
        assert!(!DelegatedRole::CompanyUser.includes(DelegatedRole::CompanyAdmin));
    }

    fn any_role() -> impl Strategy<Value = DelegatedRole> {
        prop::sample::select(DelegatedRole::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn includes_is_total_and_transitive(a in any_role(), b in any_role(), c in any_role()) {
            prop_assert!(a.includes(b) || b.includes(a));
            if a.includes(b) && b.includes(c) {
                prop_assert!(a.includes(c));
            }
        }

        #[test]
        fn display_round_trips(role in any_role()) {
            prop_assert_eq!(role.to_string().parse::<DelegatedRole>().unwrap(), role);
        }
    }
}
