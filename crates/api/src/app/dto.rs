use serde::{Deserialize, Serialize};

use delegate_auth::{DelegatedRole, DirectoryUser, Permissions, UserPatch};
use delegate_core::{CompanyId, DomainError, PrincipalId};
use delegate_invitations::{InvitationRecord, IssueInvitation};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationRequest {
    pub company_id: Option<String>,
    pub role: String,
    pub valid_hours: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub company_id: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvitationsQuery {
    pub company_id: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmIResponse {
    pub id: PrincipalId,
    pub company_id: Option<CompanyId>,
    pub role: Option<DelegatedRole>,
    pub permissions: Permissions,
}

#[derive(Debug, Serialize)]
pub struct InvitationList {
    pub invitations: Vec<InvitationRecord>,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<DirectoryUser>,
}

// -------------------------
// Mapping helpers
// -------------------------

fn parse_role(raw: &str) -> Result<DelegatedRole, axum::response::Response> {
    raw.parse::<DelegatedRole>()
        .map_err(|e: DomainError| errors::bad_request(e.to_string()))
}

/// Blank company ids mean "no company".
fn parse_company(raw: Option<&str>) -> Option<CompanyId> {
    raw.and_then(|c| CompanyId::parse(c).ok())
}

impl CreateInvitationRequest {
    pub fn into_command(self) -> Result<IssueInvitation, axum::response::Response> {
        Ok(IssueInvitation {
            company_id: parse_company(self.company_id.as_deref()),
            role: parse_role(&self.role)?,
            valid_hours: self.valid_hours,
        })
    }
}

impl ListInvitationsQuery {
    /// Blank means "no filter".
    pub fn company(&self) -> Option<CompanyId> {
        parse_company(self.company_id.as_deref())
    }
}

impl UpdateUserRequest {
    pub fn into_patch(self) -> Result<UserPatch, axum::response::Response> {
        let role = self.role.as_deref().map(parse_role).transpose()?;
        let company_id = match self.company_id.as_deref() {
            None => None,
            Some(raw) => Some(
                CompanyId::parse(raw).map_err(|e| errors::bad_request(e.to_string()))?,
            ),
        };
        Ok(UserPatch {
            display_name: self.display_name,
            company_id,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_maps_role_case_insensitively_and_drops_blank_company() {
        let cmd = CreateInvitationRequest {
            company_id: Some("  ".into()),
            role: "companyuser".into(),
            valid_hours: 12,
        }
        .into_command()
        .unwrap();
        assert_eq!(cmd.company_id, None);
        assert_eq!(cmd.role, DelegatedRole::CompanyUser);
    }

    #[test]
    fn unknown_roles_are_rejected() {
        let req = CreateInvitationRequest {
            company_id: None,
            role: "Owner".into(),
            valid_hours: 1,
        };
        assert!(req.into_command().is_err());

        let patch = UpdateUserRequest {
            role: Some("Owner".into()),
            ..Default::default()
        };
        assert!(patch.into_patch().is_err());
    }

    #[test]
    fn blank_list_filter_means_everything() {
        let blank = ListInvitationsQuery {
            company_id: Some(" ".into()),
        };
        assert_eq!(blank.company(), None);
        let set = ListInvitationsQuery {
            company_id: Some("contoso".into()),
        };
        assert_eq!(set.company(), Some(CompanyId::new("contoso")));
    }

    #[test]
    fn update_request_rejects_blank_company() {
        let patch = UpdateUserRequest {
            company_id: Some(" ".into()),
            ..Default::default()
        };
        assert!(patch.into_patch().is_err());
    }
}
