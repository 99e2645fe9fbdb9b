//! Administrative management of directory principals.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use delegate_auth::{
    AuthzError, DirectoryUser, ManagementScope, Principal, UserPatch, ensure_can_assign,
    ensure_in_scope, ensure_not_self, ensure_outranks, filter_visible, management_scope,
};
use delegate_core::PrincipalId;

use crate::directory::{DirectoryError, UserDirectory};

#[derive(Debug, Error)]
pub enum UserAdminError {
    #[error(transparent)]
    Unauthorized(#[from] AuthzError),

    #[error("{0}")]
    Validation(String),

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Directory(DirectoryError),
}

impl From<DirectoryError> for UserAdminError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UserNotFound(_) => UserAdminError::NotFound,
            other => UserAdminError::Directory(other),
        }
    }
}

pub struct UserAdminService {
    directory: Arc<dyn UserDirectory>,
}

impl UserAdminService {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Users visible to `principal`, ordered by (company, role, display name).
    #[instrument(skip(self, principal), fields(principal = %principal.id), err)]
    pub async fn list_users(&self, principal: &Principal) -> Result<Vec<DirectoryUser>, UserAdminError> {
        let scope = management_scope(principal)?;
        let users = self.directory.list_users(scope.company_filter()).await?;
        let mut visible = filter_visible(users, principal);
        visible.sort_by(|a, b| {
            (a.company_id.as_ref(), a.role, &a.display_name).cmp(&(
                b.company_id.as_ref(),
                b.role,
                &b.display_name,
            ))
        });
        Ok(visible)
    }

    /// Patch another user's name, company or role.
    ///
    /// Company administrators stay inside their company, cannot hand out
    /// `GlobalAdmin` and cannot touch global administrators.
    #[instrument(skip(self, principal, patch), fields(principal = %principal.id, target = %id), err)]
    pub async fn update_user(
        &self,
        principal: &Principal,
        id: &PrincipalId,
        patch: &UserPatch,
    ) -> Result<DirectoryUser, UserAdminError> {
        let scope = management_scope(principal)?;
        ensure_not_self(principal, id)?;
        if patch.is_empty() {
            return Err(UserAdminError::Validation("nothing to update".to_string()));
        }
        if patch
            .display_name
            .as_ref()
            .is_some_and(|n| n.trim().is_empty())
        {
            return Err(UserAdminError::Validation("displayName must not be blank".to_string()));
        }

        let target = self.existing(id).await?;
        ensure_in_scope(principal, &target)?;
        ensure_outranks(principal, target.role)?;

        if let (ManagementScope::Company(_), Some(new_company)) = (&scope, &patch.company_id) {
            if !scope.covers(Some(new_company)) {
                return Err(AuthzError::CompanyNotSelectable.into());
            }
        }
        if let Some(role) = patch.role {
            ensure_can_assign(principal, role)?;
        }

        let updated = self.directory.update_user(id, patch).await?;
        info!(company_id = ?updated.company_id, role = ?updated.role, "user updated");
        Ok(updated)
    }

    #[instrument(skip(self, principal), fields(principal = %principal.id, target = %id), err)]
    pub async fn delete_user(&self, principal: &Principal, id: &PrincipalId) -> Result<(), UserAdminError> {
        management_scope(principal)?;
        ensure_not_self(principal, id)?;

        let target = self.existing(id).await?;
        ensure_in_scope(principal, &target)?;
        ensure_outranks(principal, target.role)?;

        self.directory.delete_user(id).await?;
        info!("user deleted");
        Ok(())
    }

    async fn existing(&self, id: &PrincipalId) -> Result<DirectoryUser, UserAdminError> {
        self.directory
            .get_user(id)
            .await?
            .ok_or(UserAdminError::NotFound)
    }
}
