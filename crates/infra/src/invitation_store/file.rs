//! Flat-file invitation store: one JSON document per code.
//!
//! - creation writes a private temp file and hard-links it into place, so a
//!   code is never overwritten and readers never see a half-written document
//! - redemption renames the document to a unique tombstone; `rename` is atomic,
//!   so only one racing caller finds the source file

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use delegate_auth::DelegatedRole;
use delegate_core::{CompanyId, PrincipalId};
use delegate_invitations::{InvitationCode, InvitationRecord};

use super::r#trait::{InvitationStore, StoreError, in_company};

const EXTENSION: &str = "json";

/// On-disk document layout.
///
/// `expiresTime` is optional on read: documents written without it load as
/// already expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedInvitation {
    pub invitation_code: String,
    #[serde(default)]
    pub company_id: Option<String>,
    pub delegated_user_management_role: String,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_time: Option<DateTime<Utc>>,
}

impl From<&InvitationRecord> for PersistedInvitation {
    fn from(r: &InvitationRecord) -> Self {
        Self {
            invitation_code: r.code.as_str().to_string(),
            company_id: r.company_id.as_ref().map(|c| c.as_str().to_string()),
            delegated_user_management_role: r.role.as_str().to_string(),
            created_by: r.created_by.as_ref().map(|p| p.as_str().to_string()),
            created_time: Some(r.created_at),
            expires_time: Some(r.expires_at),
        }
    }
}

impl PersistedInvitation {
    pub fn into_record(self) -> Result<InvitationRecord, StoreError> {
        let code = InvitationCode::parse(&self.invitation_code)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let role = self
            .delegated_user_management_role
            .parse::<DelegatedRole>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let expires_at = self.expires_time.unwrap_or(DateTime::<Utc>::MIN_UTC);
        Ok(InvitationRecord {
            code,
            company_id: non_blank(self.company_id).map(CompanyId::new),
            role,
            created_by: non_blank(self.created_by).map(PrincipalId::new),
            created_at: self.created_time.unwrap_or(expires_at),
            expires_at,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct FileInvitationStore {
    dir: PathBuf,
}

impl FileInvitationStore {
    /// Open (and create if needed) the directory holding invitation documents.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create directory", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `None` for codes that are not safe as file names; those are never stored.
    fn path_for(&self, code: &InvitationCode) -> Option<PathBuf> {
        code.is_key_safe()
            .then(|| self.dir.join(format!("{}.{EXTENSION}", code.as_str())))
    }

    /// Hidden sibling path that `list` ignores.
    fn scratch_path(&self, code: &InvitationCode, kind: &str) -> PathBuf {
        self.dir
            .join(format!(".{}.{}.{kind}", code.as_str(), uuid::Uuid::now_v7()))
    }

    async fn read_document(path: &Path) -> Result<Option<InvitationRecord>, StoreError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", path, e)),
        };
        let doc: PersistedInvitation = serde_json::from_slice(&raw)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
        doc.into_record().map(Some)
    }
}

fn io_error(operation: &str, path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Backend(format!("{operation} {}: {err}", path.display()))
}

#[async_trait::async_trait]
impl InvitationStore for FileInvitationStore {
    async fn create(&self, record: &InvitationRecord) -> Result<(), StoreError> {
        let path = self.path_for(&record.code).ok_or_else(|| {
            StoreError::Backend("invitation code is not usable as a storage key".to_string())
        })?;
        let body = serde_json::to_vec_pretty(&PersistedInvitation::from(record))
            .map_err(|e| StoreError::Backend(format!("serialize invitation: {e}")))?;

        let tmp = self.scratch_path(&record.code, "tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| io_error("write", &tmp, e))?;

        let linked = tokio::fs::hard_link(&tmp, &path).await;
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::AlreadyExists),
            Err(e) => Err(io_error("link", &path, e)),
        }
    }

    async fn get(&self, code: &InvitationCode) -> Result<Option<InvitationRecord>, StoreError> {
        match self.path_for(code) {
            Some(path) => Self::read_document(&path).await,
            None => Ok(None),
        }
    }

    async fn take(&self, code: &InvitationCode) -> Result<Option<InvitationRecord>, StoreError> {
        let Some(path) = self.path_for(code) else {
            return Ok(None);
        };
        let tombstone = self.scratch_path(code, "redeemed");
        match tokio::fs::rename(&path, &tombstone).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("rename", &path, e)),
        }

        let record = Self::read_document(&tombstone).await;
        if let Err(e) = tokio::fs::remove_file(&tombstone).await {
            warn!(path = %tombstone.display(), error = %e, "failed to remove redeemed invitation");
        }
        record
    }

    async fn delete(&self, code: &InvitationCode) -> Result<bool, StoreError> {
        let Some(path) = self.path_for(code) else {
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("remove", &path, e)),
        }
    }

    async fn list(&self, company: Option<&CompanyId>) -> Result<Vec<InvitationRecord>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error("list", &self.dir, e))?;

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("list", &self.dir, e))?
        {
            let path = entry.path();
            let visible = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.'));
            let is_document = path.extension().and_then(|e| e.to_str()) == Some(EXTENSION);
            if !visible || !is_document {
                continue;
            }

            match Self::read_document(&path).await {
                Ok(Some(record)) if in_company(&record, company) => records.push(record),
                Ok(_) => {}
                // One bad document must not hide every other invitation.
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable invitation"),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(company: Option<&str>) -> InvitationRecord {
        let now = Utc::now();
        InvitationRecord {
            code: InvitationCode::generate(),
            company_id: company.map(CompanyId::new),
            role: DelegatedRole::CompanyAdmin,
            created_by: Some(PrincipalId::new("admin")),
            created_at: now,
            expires_at: now + Duration::hours(2),
        }
    }

    #[tokio::test]
    async fn documents_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileInvitationStore::open(dir.path()).await.unwrap();
        let r = record(Some("contoso"));

        store.create(&r).await.unwrap();
        assert_eq!(store.get(&r.code).await.unwrap(), Some(r.clone()));
        assert!(matches!(store.create(&r).await, Err(StoreError::AlreadyExists)));

        let reopened = FileInvitationStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.list(None).await.unwrap(), vec![r]);
    }

    #[tokio::test]
    async fn take_consumes_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileInvitationStore::open(dir.path()).await.unwrap();
        let r = record(None);
        store.create(&r).await.unwrap();

        assert_eq!(store.take(&r.code).await.unwrap(), Some(r.clone()));
        assert_eq!(store.take(&r.code).await.unwrap(), None);

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn unsafe_codes_never_touch_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileInvitationStore::open(dir.path().join("inv")).await.unwrap();
        std::fs::write(dir.path().join("secret.json"), b"{}").unwrap();

        let traversal = InvitationCode::parse("../../secret").unwrap();
        assert_eq!(store.get(&traversal).await.unwrap(), None);
        assert_eq!(store.take(&traversal).await.unwrap(), None);
        assert!(!store.delete(&traversal).await.unwrap());
        assert!(dir.path().join("secret.json").exists());
    }

    #[tokio::test]
    async fn document_without_expiry_loads_as_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileInvitationStore::open(dir.path()).await.unwrap();
        std::fs::write(
            dir.path().join("legacycode01.json"),
            br#"{"invitationCode":"legacycode01","companyId":"contoso","delegatedUserManagementRole":"CompanyUser"}"#,
        )
        .unwrap();

        let code = InvitationCode::parse("legacycode01").unwrap();
        let loaded = store.get(&code).await.unwrap().unwrap();
        assert!(loaded.is_expired(Utc::now()));
        assert_eq!(loaded.company_id, Some(CompanyId::new("contoso")));
    }

    #[tokio::test]
    async fn corrupt_documents_are_skipped_when_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileInvitationStore::open(dir.path()).await.unwrap();
        let r = record(Some("contoso"));
        store.create(&r).await.unwrap();
        std::fs::write(dir.path().join("brokencode01.json"), b"not json").unwrap();

        assert_eq!(store.list(None).await.unwrap(), vec![r]);
        let broken = InvitationCode::parse("brokencode01").unwrap();
        assert!(matches!(store.get(&broken).await, Err(StoreError::Corrupt(_))));
    }
}
