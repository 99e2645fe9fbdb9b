use std::sync::Arc;

use thiserror::Error;

use delegate_core::CompanyId;
use delegate_invitations::{InvitationCode, InvitationRecord};

/// Invitation store operation error.
///
/// These are infrastructure failures; "no such code" is `Ok(None)`, not an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an invitation with this code already exists")]
    AlreadyExists,

    #[error("stored invitation is unreadable: {0}")]
    Corrupt(String),

    #[error("invitation storage failed: {0}")]
    Backend(String),
}

/// Durable keyed storage for invitation records.
///
/// ## Implementation Requirements
///
/// - `create` never overwrites: a second record with the same code is `AlreadyExists`
/// - `take` is the redemption primitive: fetch-and-delete as one atomic step, so
///   concurrent callers racing on one code see exactly one `Some`
/// - `delete` is idempotent and reports whether something was removed
/// - `list` returns the full set at call time; `company` filters case-insensitively
#[async_trait::async_trait]
pub trait InvitationStore: Send + Sync {
    async fn create(&self, record: &InvitationRecord) -> Result<(), StoreError>;

    async fn get(&self, code: &InvitationCode) -> Result<Option<InvitationRecord>, StoreError>;

    async fn take(&self, code: &InvitationCode) -> Result<Option<InvitationRecord>, StoreError>;

    async fn delete(&self, code: &InvitationCode) -> Result<bool, StoreError>;

    async fn list(&self, company: Option<&CompanyId>) -> Result<Vec<InvitationRecord>, StoreError>;
}

#[async_trait::async_trait]
impl<S> InvitationStore for Arc<S>
where
    S: InvitationStore + ?Sized,
{
    async fn create(&self, record: &InvitationRecord) -> Result<(), StoreError> {
        (**self).create(record).await
    }

    async fn get(&self, code: &InvitationCode) -> Result<Option<InvitationRecord>, StoreError> {
        (**self).get(code).await
    }

    async fn take(&self, code: &InvitationCode) -> Result<Option<InvitationRecord>, StoreError> {
        (**self).take(code).await
    }

    async fn delete(&self, code: &InvitationCode) -> Result<bool, StoreError> {
        (**self).delete(code).await
    }

    async fn list(&self, company: Option<&CompanyId>) -> Result<Vec<InvitationRecord>, StoreError> {
        (**self).list(company).await
    }
}

/// Shared company filter used by backends that filter in process.
pub(crate) fn in_company(record: &InvitationRecord, company: Option<&CompanyId>) -> bool {
    match company {
        None => true,
        Some(wanted) => record
            .company_id
            .as_ref()
            .is_some_and(|c| c.matches(wanted)),
    }
}
