//! Resolve a user's application roles through the directory.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use delegate_core::{AppId, PrincipalId};

use crate::directory::{AppRoleDirectory, DirectoryError};

#[derive(Debug, Error)]
pub enum RoleResolutionError {
    #[error("expected exactly one registration for application '{app_id}', found {found}")]
    AmbiguousOrMissingApplication { app_id: AppId, found: usize },

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

pub struct RoleResolver {
    directory: Arc<dyn AppRoleDirectory>,
}

impl RoleResolver {
    pub fn new(directory: Arc<dyn AppRoleDirectory>) -> Self {
        Self { directory }
    }

    /// Role names assigned to `user` on the application whose client id is `app_id`.
    ///
    /// Assignments that point at ids missing from the role catalog (e.g. the
    /// directory's implicit default-access role) are skipped.
    #[instrument(skip(self), fields(user = %user, app_id = %app_id), err)]
    pub async fn resolve(
        &self,
        user: &PrincipalId,
        app_id: &AppId,
    ) -> Result<BTreeSet<String>, RoleResolutionError> {
        let mut registrations = self.directory.find_applications(app_id).await?;
        if registrations.len() != 1 {
            return Err(RoleResolutionError::AmbiguousOrMissingApplication {
                app_id: app_id.clone(),
                found: registrations.len(),
            });
        }
        let registration = registrations.remove(0);

        let assignments = self.directory.role_assignments(user, registration.id).await?;
        let mut roles = BTreeSet::new();
        for assignment in &assignments {
            match registration.role_value(assignment.app_role_id) {
                Some(value) => {
                    roles.insert(value.to_string());
                }
                None => debug!(app_role_id = %assignment.app_role_id, "assignment without catalog entry"),
            }
        }
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use delegate_auth::{DelegatedRole, DirectoryUser};

    use crate::directory::{AppRegistration, AppRoleDefinition, InMemoryDirectory};

    use super::*;

    const ADMIN: Uuid = Uuid::from_u128(0xa1);
    const EDITOR: Uuid = Uuid::from_u128(0xa2);
    const READER: Uuid = Uuid::from_u128(0xa3);
    const APP_OBJECT: Uuid = Uuid::from_u128(0x100);

    fn registration(id: Uuid, app_id: &str) -> AppRegistration {
        AppRegistration {
            id,
            app_id: AppId::new(app_id),
            app_roles: vec![
                AppRoleDefinition { id: ADMIN, value: "Admin".into() },
                AppRoleDefinition { id: EDITOR, value: "Editor".into() },
                AppRoleDefinition { id: READER, value: "Reader".into() },
            ],
        }
    }

    fn directory() -> Arc<InMemoryDirectory> {
        let dir = Arc::new(InMemoryDirectory::new());
        let u1 = PrincipalId::new("u1");
        dir.insert_user(DirectoryUser {
            id: u1.clone(),
            display_name: "User One".into(),
            company_id: None,
            role: Some(DelegatedRole::CompanyUser),
            invitation_code: None,
        });
        dir.add_application(registration(APP_OBJECT, "app1"));
        dir.assign_role(&u1, APP_OBJECT, ADMIN);
        dir.assign_role(&u1, APP_OBJECT, EDITOR);
        dir.assign_role(&u1, APP_OBJECT, Uuid::nil());
        dir
    }

    #[tokio::test]
    async fn maps_assignments_to_role_names() {
        let resolver = RoleResolver::new(directory());
        let roles = resolver
            .resolve(&PrincipalId::new("u1"), &AppId::new("app1"))
            .await
            .unwrap();
        assert_eq!(roles.into_iter().collect::<Vec<_>>(), ["Admin", "Editor"]);
    }

    #[tokio::test]
    async fn missing_or_duplicate_registration_is_an_error() {
        let dir = directory();
        let resolver = RoleResolver::new(dir.clone());

        let err = resolver
            .resolve(&PrincipalId::new("u1"), &AppId::new("unknown"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RoleResolutionError::AmbiguousOrMissingApplication { found: 0, .. }
        ));

        dir.add_application(registration(Uuid::from_u128(0x200), "app1"));
        let err = resolver
            .resolve(&PrincipalId::new("u1"), &AppId::new("app1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RoleResolutionError::AmbiguousOrMissingApplication { found: 2, .. }
        ));
    }

    #[tokio::test]
    async fn directory_failures_surface() {
        let dir = directory();
        dir.set_unavailable(true);
        let err = RoleResolver::new(dir)
            .resolve(&PrincipalId::new("u1"), &AppId::new("app1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RoleResolutionError::Directory(_)));
    }
}
