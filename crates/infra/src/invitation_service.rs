//! Invitation lifecycle: issue, validate, redeem, cancel, list, bootstrap.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use delegate_auth::{
    AuthzError, Principal, ensure_in_scope, ensure_outranks, filter_visible, management_scope,
};
use delegate_core::{Clock, CompanyId, DomainError};
use delegate_invitations::{
    InvalidReason, InvitationCode, InvitationRecord, IssueInvitation, Validation, plan_issue,
    sort_for_display,
};

use crate::directory::{DirectoryError, UserDirectory};
use crate::invitation_store::{InvitationStore, StoreError};

/// Fresh codes drawn before giving up on a (practically impossible) collision.
const MAX_ISSUE_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum InvitationServiceError {
    #[error(transparent)]
    Unauthorized(#[from] AuthzError),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("could not allocate a unique invitation code")]
    CodeExhausted,
}

impl From<DomainError> for InvitationServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Unauthorized => InvitationServiceError::Unauthorized(AuthzError::NotManager),
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                InvitationServiceError::Validation(msg)
            }
        }
    }
}

pub struct InvitationService {
    store: Arc<dyn InvitationStore>,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
}

impl InvitationService {
    pub fn new(
        store: Arc<dyn InvitationStore>,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
        }
    }

    /// Create and persist a new invitation on behalf of `issuer`.
    #[instrument(skip(self, issuer, cmd), fields(issuer = %issuer.id, role = %cmd.role), err)]
    pub async fn issue(
        &self,
        issuer: &Principal,
        cmd: &IssueInvitation,
    ) -> Result<InvitationRecord, InvitationServiceError> {
        management_scope(issuer)?;
        let now = self.clock.now();

        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let record = plan_issue(issuer, cmd, InvitationCode::generate(), now)?;
            match self.store.create(&record).await {
                Ok(()) => {
                    info!(
                        code = %record.code.redacted(),
                        company_id = ?record.company_id,
                        role = %record.role,
                        expires_at = %record.expires_at,
                        "invitation issued"
                    );
                    return Ok(record);
                }
                Err(StoreError::AlreadyExists) => warn!("generated invitation code collided; retrying"),
                Err(e) => return Err(e.into()),
            }
        }
        Err(InvitationServiceError::CodeExhausted)
    }

    /// Look a submitted code up without consuming it.
    #[instrument(skip_all, err)]
    pub async fn validate(&self, raw_code: &str) -> Result<Validation, StoreError> {
        let code = match Self::usable_code(raw_code) {
            Ok(code) => code,
            Err(reason) => return Ok(Validation::Invalid(reason)),
        };
        let found = self.store.get(&code).await?;
        Ok(Validation::from_lookup(found, self.clock.now()))
    }

    /// Validate and consume a code. At most one caller ever receives `Valid` for a given code.
    #[instrument(skip_all, err)]
    pub async fn redeem(&self, raw_code: &str) -> Result<Validation, StoreError> {
        let code = match Self::usable_code(raw_code) {
            Ok(code) => code,
            Err(reason) => return Ok(Validation::Invalid(reason)),
        };

        let now = self.clock.now();
        if let invalid @ Validation::Invalid(_) =
            Validation::from_lookup(self.store.get(&code).await?, now)
        {
            return Ok(invalid);
        }

        // A concurrent redemption between `get` and `take` leaves nothing to take.
        let outcome = match self.store.take(&code).await? {
            Some(record) => Validation::Valid(record),
            None => Validation::Invalid(InvalidReason::NotFound),
        };
        match &outcome {
            Validation::Valid(record) => info!(
                code = %code.redacted(),
                company_id = ?record.company_id,
                role = %record.role,
                "invitation redeemed"
            ),
            Validation::Invalid(reason) => info!(code = %code.redacted(), %reason, "invitation lost redemption race"),
        }
        Ok(outcome)
    }

    /// Administrative cancel. Deleting an absent code succeeds.
    #[instrument(skip(self, principal), fields(principal = %principal.id), err)]
    pub async fn delete(&self, raw_code: &str, principal: &Principal) -> Result<(), InvitationServiceError> {
        management_scope(principal)?;
        let Ok(code) = Self::usable_code(raw_code) else {
            return Ok(());
        };
        let Some(record) = self.store.get(&code).await? else {
            return Ok(());
        };
        ensure_in_scope(principal, &record)?;
        ensure_outranks(principal, Some(record.role))?;
        if self.store.delete(&code).await? {
            info!(code = %code.redacted(), "invitation deleted");
        }
        Ok(())
    }

    /// Pending invitations visible to `principal`, ordered by (company, role),
    /// optionally narrowed to one company.
    ///
    /// While the directory holds no users this also makes sure the bootstrap
    /// invitation exists, so the first administrator can sign up.
    #[instrument(skip(self, principal), fields(principal = %principal.id, company = ?company), err)]
    pub async fn list_pending(
        &self,
        principal: &Principal,
        company: Option<&CompanyId>,
    ) -> Result<Vec<InvitationRecord>, InvitationServiceError> {
        let scope = management_scope(principal)?;
        if let Some(company) = company {
            if !scope.covers(Some(company)) {
                return Err(AuthzError::ScopeMismatch.into());
            }
        }
        self.ensure_bootstrap().await?;

        let filter = company.or(scope.company_filter());
        let records = self.store.list(filter).await?;
        let mut visible = filter_visible(records, principal);
        sort_for_display(&mut visible);
        Ok(visible)
    }

    /// Recreate the bootstrap invitation if the directory is empty and it is
    /// absent or expired. Returns it while the directory is empty, `None` after.
    #[instrument(skip(self), err)]
    pub async fn ensure_bootstrap(&self) -> Result<Option<InvitationRecord>, InvitationServiceError> {
        if !self.directory.list_users(None).await?.is_empty() {
            return Ok(None);
        }

        let now = self.clock.now();
        let code = InvitationCode::bootstrap();
        if let Some(existing) = self.store.get(&code).await? {
            if !existing.is_expired(now) {
                return Ok(Some(existing));
            }
            self.store.delete(&code).await?;
        }

        let record = InvitationRecord::bootstrap(now);
        match self.store.create(&record).await {
            Ok(()) => {
                info!(expires_at = %record.expires_at, "bootstrap invitation created");
                Ok(Some(record))
            }
            // Another request created it first.
            Err(StoreError::AlreadyExists) => Ok(self.store.get(&code).await?),
            Err(e) => Err(e.into()),
        }
    }

    /// Malformed input and codes that cannot be storage keys never reach the store.
    fn usable_code(raw: &str) -> Result<InvitationCode, InvalidReason> {
        let code = Validation::parse_code(raw)?;
        if code.is_key_safe() {
            Ok(code)
        } else {
            Err(InvalidReason::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use delegate_auth::{DelegatedRole, DirectoryUser};
    use delegate_core::{FixedClock, PrincipalId};
    use delegate_invitations::BOOTSTRAP_CODE;

    use crate::directory::InMemoryDirectory;
    use crate::invitation_store::InMemoryInvitationStore;

    use super::*;

    struct Harness {
        service: InvitationService,
        store: Arc<InMemoryInvitationStore>,
        directory: Arc<InMemoryDirectory>,
        clock: Arc<FixedClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryInvitationStore::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()));
        let service = InvitationService::new(store.clone(), directory.clone(), clock.clone());
        Harness {
            service,
            store,
            directory,
            clock,
        }
    }

    fn admin(role: DelegatedRole, company: Option<&str>) -> Principal {
        Principal::new(PrincipalId::new("admin"), company.map(CompanyId::new), Some(role))
    }

    fn existing_user(h: &Harness) {
        h.directory.insert_user(DirectoryUser {
            id: PrincipalId::new("admin"),
            display_name: "Admin".into(),
            company_id: None,
            role: Some(DelegatedRole::GlobalAdmin),
            invitation_code: None,
        });
    }

    fn cmd(company: Option<&str>, role: DelegatedRole, hours: i64) -> IssueInvitation {
        IssueInvitation {
            company_id: company.map(CompanyId::new),
            role,
            valid_hours: hours,
        }
    }

    #[tokio::test]
    async fn issued_codes_redeem_exactly_once() {
        let h = harness();
        let record = h
            .service
            .issue(&admin(DelegatedRole::GlobalAdmin, None), &cmd(Some("contoso"), DelegatedRole::CompanyUser, 24))
            .await
            .unwrap();

        assert_eq!(
            h.service.validate(record.code.as_str()).await.unwrap(),
            Validation::Valid(record.clone())
        );
        assert_eq!(
            h.service.redeem(record.code.as_str()).await.unwrap(),
            Validation::Valid(record.clone())
        );
        assert_eq!(
            h.service.redeem(record.code.as_str()).await.unwrap(),
            Validation::Invalid(InvalidReason::NotFound)
        );
    }

    #[tokio::test]
    async fn expired_codes_are_rejected_and_kept() {
        let h = harness();
        let record = h
            .service
            .issue(&admin(DelegatedRole::GlobalAdmin, None), &cmd(Some("contoso"), DelegatedRole::CompanyAdmin, 1))
            .await
            .unwrap();

        h.clock.set(record.expires_at + Duration::seconds(1));
        assert_eq!(
            h.service.redeem(record.code.as_str()).await.unwrap(),
            Validation::Invalid(InvalidReason::Expired)
        );
        h.clock.set(record.expires_at);
        assert_eq!(
            h.service.validate(record.code.as_str()).await.unwrap(),
            Validation::Invalid(InvalidReason::Expired)
        );
        assert!(h.store.get(&record.code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn malformed_and_unknown_codes() {
        let h = harness();
        assert_eq!(
            h.service.redeem("").await.unwrap(),
            Validation::Invalid(InvalidReason::Malformed)
        );
        assert_eq!(
            h.service.redeem("short").await.unwrap(),
            Validation::Invalid(InvalidReason::Malformed)
        );
        assert_eq!(
            h.service.redeem("never-issued-code").await.unwrap(),
            Validation::Invalid(InvalidReason::NotFound)
        );
        assert_eq!(
            h.service.redeem("../../etc/passwd").await.unwrap(),
            Validation::Invalid(InvalidReason::NotFound)
        );
    }

    #[tokio::test]
    async fn plain_users_cannot_issue_list_or_delete() {
        let h = harness();
        let user = admin(DelegatedRole::CompanyUser, Some("contoso"));
        assert!(matches!(
            h.service.issue(&user, &cmd(None, DelegatedRole::CompanyUser, 1)).await,
            Err(InvitationServiceError::Unauthorized(AuthzError::NotManager))
        ));
        assert!(matches!(
            h.service.list_pending(&user, None).await,
            Err(InvitationServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            h.service.delete("whatever-code", &user).await,
            Err(InvitationServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn invalid_validity_is_a_validation_error() {
        let h = harness();
        let err = h
            .service
            .issue(&admin(DelegatedRole::GlobalAdmin, None), &cmd(None, DelegatedRole::CompanyUser, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, InvitationServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn company_admin_listing_and_deletion_are_scoped() {
        let h = harness();
        existing_user(&h);
        let global = admin(DelegatedRole::GlobalAdmin, None);
        let contoso_admin = admin(DelegatedRole::CompanyAdmin, Some("contoso"));

        let ours = h
            .service
            .issue(&global, &cmd(Some("contoso"), DelegatedRole::CompanyUser, 24))
            .await
            .unwrap();
        let theirs = h
            .service
            .issue(&global, &cmd(Some("fabrikam"), DelegatedRole::CompanyUser, 24))
            .await
            .unwrap();
        h.service
            .issue(&global, &cmd(None, DelegatedRole::GlobalAdmin, 24))
            .await
            .unwrap();

        let visible = h.service.list_pending(&contoso_admin, None).await.unwrap();
        assert_eq!(visible, vec![ours.clone()]);
        assert_eq!(h.service.list_pending(&global, None).await.unwrap().len(), 3);

        assert!(matches!(
            h.service.delete(theirs.code.as_str(), &contoso_admin).await,
            Err(InvitationServiceError::Unauthorized(AuthzError::ScopeMismatch))
        ));
        h.service.delete(ours.code.as_str(), &contoso_admin).await.unwrap();
        h.service.delete(ours.code.as_str(), &contoso_admin).await.unwrap();
        assert!(h.store.get(&ours.code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bootstrap_exists_only_while_directory_is_empty() {
        let h = harness();
        let global = admin(DelegatedRole::GlobalAdmin, None);

        let listed = h.service.list_pending(&global, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].code.as_str(), BOOTSTRAP_CODE);
        assert_eq!(listed[0].role, DelegatedRole::GlobalAdmin);

        // Idempotent while nobody has signed up.
        let again = h.service.ensure_bootstrap().await.unwrap().unwrap();
        assert_eq!(again, listed[0]);

        assert!(h.service.redeem(BOOTSTRAP_CODE).await.unwrap().is_valid());
        assert_eq!(
            h.service.redeem(BOOTSTRAP_CODE).await.unwrap(),
            Validation::Invalid(InvalidReason::NotFound)
        );

        existing_user(&h);
        assert_eq!(h.service.ensure_bootstrap().await.unwrap(), None);
        assert!(h.service.list_pending(&global, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_bootstrap_is_replaced() {
        let h = harness();
        let first = h.service.ensure_bootstrap().await.unwrap().unwrap();
        h.clock.set(first.expires_at);

        let second = h.service.ensure_bootstrap().await.unwrap().unwrap();
        assert_eq!(second.created_at, first.expires_at);
        assert!(!second.is_expired(h.clock.now()));
    }

    #[tokio::test]
    async fn directory_outage_fails_listing() {
        let h = harness();
        h.directory.set_unavailable(true);
        assert!(matches!(
            h.service.list_pending(&admin(DelegatedRole::GlobalAdmin, None), None).await,
            Err(InvitationServiceError::Directory(_))
        ));
    }

    #[tokio::test]
    async fn company_admin_cannot_cancel_a_global_admin_invitation() {
        let h = harness();
        let global = admin(DelegatedRole::GlobalAdmin, None);
        let contoso_admin = admin(DelegatedRole::CompanyAdmin, Some("contoso"));

        let elevated = h
            .service
            .issue(&global, &cmd(Some("contoso"), DelegatedRole::GlobalAdmin, 24))
            .await
            .unwrap();
        assert!(matches!(
            h.service.delete(elevated.code.as_str(), &contoso_admin).await,
            Err(InvitationServiceError::Unauthorized(AuthzError::Outranked(DelegatedRole::GlobalAdmin)))
        ));
        assert!(h.store.get(&elevated.code).await.unwrap().is_some());

        h.service.delete(elevated.code.as_str(), &global).await.unwrap();
        assert!(h.store.get(&elevated.code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_can_be_narrowed_to_one_company() {
        let h = harness();
        existing_user(&h);
        let global = admin(DelegatedRole::GlobalAdmin, None);
        let contoso_admin = admin(DelegatedRole::CompanyAdmin, Some("contoso"));
        let contoso = CompanyId::new("contoso");
        let fabrikam = CompanyId::new("fabrikam");

        let ours = h
            .service
            .issue(&global, &cmd(Some("contoso"), DelegatedRole::CompanyUser, 24))
            .await
            .unwrap();
        h.service
            .issue(&global, &cmd(Some("fabrikam"), DelegatedRole::CompanyUser, 24))
            .await
            .unwrap();
        h.service
            .issue(&global, &cmd(None, DelegatedRole::GlobalAdmin, 24))
            .await
            .unwrap();

        assert_eq!(
            h.service.list_pending(&global, Some(&contoso)).await.unwrap(),
            vec![ours.clone()]
        );
        assert_eq!(
            h.service.list_pending(&contoso_admin, Some(&contoso)).await.unwrap(),
            vec![ours]
        );
        assert!(matches!(
            h.service.list_pending(&contoso_admin, Some(&fabrikam)).await,
            Err(InvitationServiceError::Unauthorized(AuthzError::ScopeMismatch))
        ));
    }

    #[tokio::test]
    async fn company_roles_without_company_are_rejected() {
        let h = harness();
        let err = h
            .service
            .issue(&admin(DelegatedRole::GlobalAdmin, None), &cmd(None, DelegatedRole::CompanyUser, 24))
            .await
            .unwrap_err();
        assert!(matches!(err, InvitationServiceError::Validation(_)));
    }
}
