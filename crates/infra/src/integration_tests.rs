//! Integration tests for the invitation pipeline.
//!
//! Tests: InvitationService → InvitationStore (memory + file) under concurrency
//!
//! Verifies:
//! - Concurrent redemption of one code yields exactly one success
//! - Codes issued by different administrators never collide

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use delegate_auth::{DelegatedRole, Principal};
    use delegate_core::{CompanyId, PrincipalId, SystemClock};
    use delegate_invitations::{InvalidReason, IssueInvitation, Validation};

    use crate::directory::InMemoryDirectory;
    use crate::invitation_service::InvitationService;
    use crate::invitation_store::{FileInvitationStore, InMemoryInvitationStore, InvitationStore};

    const RACERS: usize = 32;

    fn service(store: Arc<dyn InvitationStore>) -> Arc<InvitationService> {
        Arc::new(InvitationService::new(
            store,
            Arc::new(InMemoryDirectory::new()),
            Arc::new(SystemClock),
        ))
    }

    fn global_admin() -> Principal {
        Principal::new(PrincipalId::new("root"), None, Some(DelegatedRole::GlobalAdmin))
    }

    async fn race_redemptions(service: Arc<InvitationService>) {
        let record = service
            .issue(
                &global_admin(),
                &IssueInvitation {
                    company_id: Some(CompanyId::new("contoso")),
                    role: DelegatedRole::CompanyUser,
                    valid_hours: 1,
                },
            )
            .await
            .unwrap();

        let mut handles = Vec::with_capacity(RACERS);
        for _ in 0..RACERS {
            let service = service.clone();
            let code = record.code.as_str().to_string();
            handles.push(tokio::spawn(async move { service.redeem(&code).await }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                Validation::Valid(redeemed) => {
                    assert_eq!(redeemed, record);
                    successes += 1;
                }
                Validation::Invalid(reason) => assert_eq!(reason, InvalidReason::NotFound),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_redemption_in_memory_has_one_winner() {
        race_redemptions(service(Arc::new(InMemoryInvitationStore::new()))).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_redemption_on_disk_has_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileInvitationStore::open(dir.path()).await.unwrap();
        race_redemptions(service(Arc::new(store))).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_issuance_produces_distinct_codes() {
        let service = service(Arc::new(InMemoryInvitationStore::new()));
        let mut handles = Vec::new();
        for i in 0..200 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let issuer = Principal::new(
                    PrincipalId::new(format!("admin-{}", i % 4)),
                    Some(CompanyId::new("contoso")),
                    Some(DelegatedRole::CompanyAdmin),
                );
                service
                    .issue(
                        &issuer,
                        &IssueInvitation {
                            company_id: None,
                            role: DelegatedRole::GlobalAdmin,
                            valid_hours: 24,
                        },
                    )
                    .await
            }));
        }

        let mut codes = HashSet::new();
        for handle in handles {
            let record = handle.await.unwrap().unwrap();
            assert_eq!(record.role, DelegatedRole::CompanyAdmin);
            assert!(codes.insert(record.code));
        }
        assert_eq!(codes.len(), 200);
    }
}
