use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use delegate_auth::{DelegatedRole, Scoped};
use delegate_core::{CompanyId, PrincipalId};

use crate::InvitationCode;

/// A pending invitation. Immutable once created; destroyed on redemption or deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationRecord {
    pub code: InvitationCode,
    /// `None` = global scope.
    pub company_id: Option<CompanyId>,
    pub role: DelegatedRole,
    /// `None` only for the bootstrap record.
    pub created_by: Option<PrincipalId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl InvitationRecord {
    /// The record that lets the very first global administrator sign up.
    ///
    /// Valid for one year from `now`, no company, no issuer.
    pub fn bootstrap(now: DateTime<Utc>) -> Self {
        let expires_at = now
            .checked_add_months(Months::new(12))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            code: InvitationCode::bootstrap(),
            company_id: None,
            role: DelegatedRole::GlobalAdmin,
            created_by: None,
            created_at: now,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Display ordering: company (global first), then role.
    pub fn display_key(&self) -> (Option<&str>, DelegatedRole) {
        (self.company_id.as_ref().map(CompanyId::as_str), self.role)
    }
}

impl Scoped for InvitationRecord {
    fn company_id(&self) -> Option<&CompanyId> {
        self.company_id.as_ref()
    }
}

/// Sort pending invitations for stable display.
pub fn sort_for_display(records: &mut [InvitationRecord]) {
    records.sort_by(|a, b| {
        a.display_key()
            .cmp(&b.display_key())
            .then_with(|| a.code.cmp(&b.code))
    });
}
