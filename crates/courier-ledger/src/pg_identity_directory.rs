//! `PostgreSQL` identity directory.
//!
//! Accounts are keyed by `(tenant_id, subject_id)`; a second create for the
//! same pair is reported as `AlreadyExists` rather than overwriting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use courier_core::gateway::{GatewayError, IdentityAccount, IdentityDirectory, NewIdentityAccount};

use crate::schema::{IDENTITY_ACCOUNTS_TABLE, IDENTITY_ACCOUNT_COLUMNS};

#[derive(Debug, FromRow)]
struct AccountRow {
    tenant_id: Uuid,
    subject_id: Uuid,
    email: String,
    display_name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for IdentityAccount {
    fn from(row: AccountRow) -> Self {
        Self {
            tenant_id: row.tenant_id,
            subject_id: row.subject_id,
            email: row.email,
            display_name: row.display_name,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

/// Identity directory stored in the `identity_accounts` table.
#[derive(Debug, Clone)]
pub struct PgIdentityDirectory {
    pool: PgPool,
}

impl PgIdentityDirectory {
    /// Creates a new `PgIdentityDirectory`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(context: &str, err: &sqlx::Error) -> GatewayError {
    GatewayError::Unavailable(format!("{context}: {err}"))
}

#[async_trait]
impl IdentityDirectory for PgIdentityDirectory {
    async fn find_account(
        &self,
        tenant_id: Uuid,
        subject_id: Uuid,
    ) -> Result<Option<IdentityAccount>, GatewayError> {
        let sql = format!(
            "SELECT {IDENTITY_ACCOUNT_COLUMNS} FROM {IDENTITY_ACCOUNTS_TABLE}
             WHERE tenant_id = $1 AND subject_id = $2"
        );
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unavailable("failed to look up identity account", &e))?;
        Ok(row.map(IdentityAccount::from))
    }

    async fn create_account(
        &self,
        tenant_id: Uuid,
        account: &NewIdentityAccount,
    ) -> Result<IdentityAccount, GatewayError> {
        let sql = format!(
            "INSERT INTO {IDENTITY_ACCOUNTS_TABLE} (tenant_id, subject_id, email, display_name, role)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (tenant_id, subject_id) DO NOTHING
             RETURNING {IDENTITY_ACCOUNT_COLUMNS}"
        );
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(account.subject_id)
            .bind(&account.email)
            .bind(&account.display_name)
            .bind(&account.role)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unavailable("failed to create identity account", &e))?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                debug!(%tenant_id, subject_id = %account.subject_id, "identity account already exists");
                Err(GatewayError::AlreadyExists(format!(
                    "account for subject {}",
                    account.subject_id
                )))
            }
        }
    }
}
