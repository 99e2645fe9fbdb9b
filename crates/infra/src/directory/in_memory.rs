use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use delegate_auth::{DirectoryUser, UserPatch};
use delegate_core::{AppId, CompanyId, PrincipalId};

use super::r#trait::{
    AppRegistration, AppRoleAssignment, AppRoleDirectory, DirectoryError, UserDirectory,
};

/// Role assignment as written in a seed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAssignment {
    pub principal_id: PrincipalId,
    pub app_role_id: Uuid,
    pub resource_id: Uuid,
}

/// Initial contents of an in-memory directory (dev/test fixtures).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySeed {
    #[serde(default)]
    pub users: Vec<DirectoryUser>,
    #[serde(default)]
    pub applications: Vec<AppRegistration>,
    #[serde(default)]
    pub assignments: Vec<SeedAssignment>,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<PrincipalId, DirectoryUser>,
    applications: Vec<AppRegistration>,
    assignments: Vec<SeedAssignment>,
}

/// In-memory directory.
///
/// Intended for tests/dev. `set_unavailable` simulates an outage of the real
/// directory so callers' failure paths can be exercised.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
    unavailable: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        let state = State {
            users: seed.users.into_iter().map(|u| (u.id.clone(), u)).collect(),
            applications: seed.applications,
            assignments: seed.assignments,
        };
        Self {
            state: RwLock::new(state),
            unavailable: AtomicBool::new(false),
        }
    }

    pub async fn from_seed_file(path: &Path) -> Result<Self, DirectoryError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("read seed {}: {e}", path.display())))?;
        let seed: DirectorySeed = serde_json::from_slice(&raw)
            .map_err(|e| DirectoryError::Unavailable(format!("parse seed {}: {e}", path.display())))?;
        Ok(Self::from_seed(seed))
    }

    /// Add or replace a user (what the identity platform does after a sign-up).
    pub fn insert_user(&self, user: DirectoryUser) {
        if let Ok(mut state) = self.state.write() {
            state.users.insert(user.id.clone(), user);
        }
    }

    pub fn add_application(&self, registration: AppRegistration) {
        if let Ok(mut state) = self.state.write() {
            state.applications.push(registration);
        }
    }

    pub fn assign_role(&self, user: &PrincipalId, resource_id: Uuid, app_role_id: Uuid) {
        if let Ok(mut state) = self.state.write() {
            state.assignments.push(SeedAssignment {
                principal_id: user.clone(),
                app_role_id,
                resource_id,
            });
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DirectoryError::Unavailable("directory is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn poisoned() -> DirectoryError {
        DirectoryError::Unavailable("lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn list_users(&self, company: Option<&CompanyId>) -> Result<Vec<DirectoryUser>, DirectoryError> {
        self.check_available()?;
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state
            .users
            .values()
            .filter(|u| u.has_custom_attributes())
            .filter(|u| match company {
                None => true,
                Some(wanted) => u.company_id.as_ref().is_some_and(|c| c.matches(wanted)),
            })
            .cloned()
            .collect())
    }

    async fn get_user(&self, id: &PrincipalId) -> Result<Option<DirectoryUser>, DirectoryError> {
        self.check_available()?;
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.users.get(id).cloned())
    }

    async fn update_user(&self, id: &PrincipalId, patch: &UserPatch) -> Result<DirectoryUser, DirectoryError> {
        self.check_available()?;
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| DirectoryError::UserNotFound(id.clone()))?;
        patch.apply_to(user);
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &PrincipalId) -> Result<(), DirectoryError> {
        self.check_available()?;
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        state
            .users
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::UserNotFound(id.clone()))?;
        state.assignments.retain(|a| &a.principal_id != id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl AppRoleDirectory for InMemoryDirectory {
    async fn find_applications(&self, app_id: &AppId) -> Result<Vec<AppRegistration>, DirectoryError> {
        self.check_available()?;
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state
            .applications
            .iter()
            .filter(|a| a.app_id.as_str().eq_ignore_ascii_case(app_id.as_str()))
            .cloned()
            .collect())
    }

    async fn role_assignments(
        &self,
        user: &PrincipalId,
        resource_id: Uuid,
    ) -> Result<Vec<AppRoleAssignment>, DirectoryError> {
        self.check_available()?;
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        if !state.users.contains_key(user) {
            return Err(DirectoryError::UserNotFound(user.clone()));
        }
        Ok(state
            .assignments
            .iter()
            .filter(|a| &a.principal_id == user && a.resource_id == resource_id)
            .map(|a| AppRoleAssignment {
                app_role_id: a.app_role_id,
                resource_id: a.resource_id,
            })
            .collect())
    }
}
