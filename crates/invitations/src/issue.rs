use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use delegate_auth::{DelegatedRole, ManagementScope, Principal, management_scope};
use delegate_core::{CompanyId, DomainError, DomainResult};

use crate::{InvitationCode, InvitationRecord};

/// Command: issue a new invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueInvitation {
    /// Ignored for company administrators.
    pub company_id: Option<CompanyId>,
    pub role: DelegatedRole,
    pub valid_hours: i64,
}

/// Decide the record an issuer is allowed to create.
///
/// - No IO
/// - Company administrators always issue into their own company and never
///   above `CompanyAdmin` (a `GlobalAdmin` request is downgraded, not rejected)
/// - Company roles need a company; only `GlobalAdmin` invitations may be global
pub fn plan_issue(
    issuer: &Principal,
    cmd: &IssueInvitation,
    code: InvitationCode,
    now: DateTime<Utc>,
) -> DomainResult<InvitationRecord> {
    let scope = management_scope(issuer).map_err(|_| DomainError::Unauthorized)?;

    if cmd.valid_hours < 1 {
        return Err(DomainError::validation("validHours must be at least 1"));
    }
    let expires_at = Duration::try_hours(cmd.valid_hours)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| DomainError::validation("validHours is out of range"))?;

    let (company_id, role) = match scope {
        ManagementScope::Global => {
            if cmd.company_id.is_none() && cmd.role != DelegatedRole::GlobalAdmin {
                return Err(DomainError::validation(format!(
                    "companyId is required for role {}",
                    cmd.role
                )));
            }
            (cmd.company_id.clone(), cmd.role)
        }
        ManagementScope::Company(own) => {
            let role = match cmd.role {
                DelegatedRole::GlobalAdmin => DelegatedRole::CompanyAdmin,
                other => other,
            };
            (Some(own), role)
        }
    };

    Ok(InvitationRecord {
        code,
        company_id,
        role,
        created_by: Some(issuer.id.clone()),
        created_at: now,
        expires_at,
    })
}
