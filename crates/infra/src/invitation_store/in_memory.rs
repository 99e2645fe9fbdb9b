use std::collections::HashMap;
use std::sync::RwLock;

use delegate_core::CompanyId;
use delegate_invitations::{InvitationCode, InvitationRecord};

use super::r#trait::{InvitationStore, StoreError, in_company};

/// In-memory invitation store.
///
/// Intended for tests/dev. A single lock makes `take` trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryInvitationStore {
    records: RwLock<HashMap<InvitationCode, InvitationRecord>>,
}

impl InMemoryInvitationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl InvitationStore for InMemoryInvitationStore {
    async fn create(&self, record: &InvitationRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        if records.contains_key(&record.code) {
            return Err(StoreError::AlreadyExists);
        }
        records.insert(record.code.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, code: &InvitationCode) -> Result<Option<InvitationRecord>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.get(code).cloned())
    }

    async fn take(&self, code: &InvitationCode) -> Result<Option<InvitationRecord>, StoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        Ok(records.remove(code))
    }

    async fn delete(&self, code: &InvitationCode) -> Result<bool, StoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        Ok(records.remove(code).is_some())
    }

    async fn list(&self, company: Option<&CompanyId>) -> Result<Vec<InvitationRecord>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records
            .values()
            .filter(|r| in_company(r, company))
            .cloned()
            .collect())
    }
}
