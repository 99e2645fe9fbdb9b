//! Postgres-backed invitation store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `AlreadyExists` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |
//!
//! Redemption is a single `DELETE ... RETURNING`, which Postgres serializes per
//! row: of two racing deletes only one returns the row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;

use delegate_auth::DelegatedRole;
use delegate_core::{CompanyId, PrincipalId};
use delegate_invitations::{InvitationCode, InvitationRecord};

use super::r#trait::{InvitationStore, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS invitations (
    code        TEXT PRIMARY KEY,
    company_id  TEXT NULL,
    role        TEXT NOT NULL,
    created_by  TEXT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    expires_at  TIMESTAMPTZ NOT NULL
)
"#;

const COLUMNS: &str = "code, company_id, role, created_by, created_at, expires_at";

#[derive(Debug, Clone)]
pub struct PostgresInvitationStore {
    pool: Arc<PgPool>,
}

impl PostgresInvitationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl InvitationStore for PostgresInvitationStore {
    #[instrument(skip_all, fields(code = %record.code.redacted()), err)]
    async fn create(&self, record: &InvitationRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO invitations (code, company_id, role, created_by, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.code.as_str())
        .bind(record.company_id.as_ref().map(CompanyId::as_str))
        .bind(record.role.as_str())
        .bind(record.created_by.as_ref().map(PrincipalId::as_str))
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create", e))?;
        Ok(())
    }

    async fn get(&self, code: &InvitationCode) -> Result<Option<InvitationRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM invitations WHERE code = $1"))
            .bind(code.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;
        row.as_ref().map(record_from_row).transpose()
    }

    #[instrument(skip_all, fields(code = %code.redacted()), err)]
    async fn take(&self, code: &InvitationCode) -> Result<Option<InvitationRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "DELETE FROM invitations WHERE code = $1 RETURNING {COLUMNS}"
        ))
        .bind(code.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("take", e))?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn delete(&self, code: &InvitationCode) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM invitations WHERE code = $1")
            .bind(code.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, company: Option<&CompanyId>) -> Result<Vec<InvitationRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS} FROM invitations
            WHERE ($1::text IS NULL OR lower(company_id) = lower($1))
            "#
        ))
        .bind(company.map(CompanyId::as_str))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;
        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &PgRow) -> Result<InvitationRecord, StoreError> {
    let corrupt = |e: sqlx::Error| StoreError::Corrupt(format!("invitation row: {e}"));

    let code: String = row.try_get("code").map_err(corrupt)?;
    let company_id: Option<String> = row.try_get("company_id").map_err(corrupt)?;
    let role: String = row.try_get("role").map_err(corrupt)?;
    let created_by: Option<String> = row.try_get("created_by").map_err(corrupt)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(corrupt)?;
    let expires_at: DateTime<Utc> = row.try_get("expires_at").map_err(corrupt)?;

    Ok(InvitationRecord {
        code: InvitationCode::parse(&code).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        company_id: company_id.map(CompanyId::new),
        role: role
            .parse::<DelegatedRole>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        created_by: created_by.map(PrincipalId::new),
        created_at,
        expires_at,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                StoreError::AlreadyExists
            } else {
                StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
