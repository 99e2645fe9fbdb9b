use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use delegate_auth::{DirectoryUser, UserPatch};
use delegate_core::{AppId, CompanyId, PrincipalId};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory user not found: {0}")]
    UserNotFound(PrincipalId),

    #[error("directory request failed: {0}")]
    Unavailable(String),
}

/// One role declared by an application registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoleDefinition {
    pub id: Uuid,
    /// Name emitted in tokens (e.g. `Admin`).
    pub value: String,
}

/// The directory object representing an application inside the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRegistration {
    /// Object id; role assignments point at this as their resource.
    pub id: Uuid,
    pub app_id: AppId,
    #[serde(default)]
    pub app_roles: Vec<AppRoleDefinition>,
}

impl AppRegistration {
    pub fn role_value(&self, role_id: Uuid) -> Option<&str> {
        self.app_roles
            .iter()
            .find(|r| r.id == role_id)
            .map(|r| r.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoleAssignment {
    pub app_role_id: Uuid,
    pub resource_id: Uuid,
}

/// Principal management operations.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Users provisioned through sign-up (those carrying custom attributes),
    /// optionally limited to one company.
    async fn list_users(&self, company: Option<&CompanyId>) -> Result<Vec<DirectoryUser>, DirectoryError>;

    async fn get_user(&self, id: &PrincipalId) -> Result<Option<DirectoryUser>, DirectoryError>;

    async fn update_user(&self, id: &PrincipalId, patch: &UserPatch) -> Result<DirectoryUser, DirectoryError>;

    async fn delete_user(&self, id: &PrincipalId) -> Result<(), DirectoryError>;
}

/// Application role catalog and assignments.
#[async_trait::async_trait]
pub trait AppRoleDirectory: Send + Sync {
    /// All registrations whose client id is `app_id` (normally zero or one).
    async fn find_applications(&self, app_id: &AppId) -> Result<Vec<AppRegistration>, DirectoryError>;

    /// Role assignments of `user` on the registration with object id `resource_id`.
    async fn role_assignments(
        &self,
        user: &PrincipalId,
        resource_id: Uuid,
    ) -> Result<Vec<AppRoleAssignment>, DirectoryError>;
}

#[async_trait::async_trait]
impl<D> UserDirectory for Arc<D>
where
    D: UserDirectory + ?Sized,
{
    async fn list_users(&self, company: Option<&CompanyId>) -> Result<Vec<DirectoryUser>, DirectoryError> {
        (**self).list_users(company).await
    }

    async fn get_user(&self, id: &PrincipalId) -> Result<Option<DirectoryUser>, DirectoryError> {
        (**self).get_user(id).await
    }

    async fn update_user(&self, id: &PrincipalId, patch: &UserPatch) -> Result<DirectoryUser, DirectoryError> {
        (**self).update_user(id, patch).await
    }

    async fn delete_user(&self, id: &PrincipalId) -> Result<(), DirectoryError> {
        (**self).delete_user(id).await
    }
}

#[async_trait::async_trait]
impl<D> AppRoleDirectory for Arc<D>
where
    D: AppRoleDirectory + ?Sized,
{
    async fn find_applications(&self, app_id: &AppId) -> Result<Vec<AppRegistration>, DirectoryError> {
        (**self).find_applications(app_id).await
    }

    async fn role_assignments(
        &self,
        user: &PrincipalId,
        resource_id: Uuid,
    ) -> Result<Vec<AppRoleAssignment>, DirectoryError> {
        (**self).role_assignments(user, resource_id).await
    }
}
