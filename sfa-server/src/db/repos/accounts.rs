//! Account repository
//!
//! Runs only inside a [`TenantScope`]; every statement carries the scope's
//! tenant explicitly.

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{DbError, TenantScope};
use crate::models::{AccountStatus, NewAccount, Pagination};

const ACCOUNT_COLUMNS: &str = "id, owner_user_id, name, industry, website, phone, status, memo, \
     created_at, updated_at";

/// Account record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub status: AccountStatus,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account repository
pub struct AccountRepo<'s> {
    scope: &'s mut TenantScope,
}

impl<'s> AccountRepo<'s> {
    pub fn new(scope: &'s mut TenantScope) -> Self {
        Self { scope }
    }

    pub async fn create(&mut self, input: &NewAccount) -> Result<Account, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "INSERT INTO accounts \
                 (tenant_id, owner_user_id, name, industry, website, phone, status, memo) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ACCOUNT_COLUMNS}"
        );

        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(tenant)
            .bind(input.owner_user_id)
            .bind(&input.name)
            .bind(input.industry.as_deref())
            .bind(input.website.as_deref())
            .bind(input.phone.as_deref())
            .bind(input.status)
            .bind(input.memo.as_deref())
            .fetch_one(self.scope.executor())
            .await?;

        Ok(account)
    }

    pub async fn get(&mut self, id: Uuid) -> Result<Account, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE tenant_id = $1 AND id = $2");

        sqlx::query_as::<_, Account>(&sql)
            .bind(tenant)
            .bind(id)
            .fetch_optional(self.scope.executor())
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "account",
                id: id.to_string(),
            })
    }

    /// Newest first, optionally filtered by status.
    pub async fn list(
        &mut self,
        status: Option<AccountStatus>,
        page: Pagination,
    ) -> Result<Vec<Account>, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE tenant_id = $1 AND ($2::account_status IS NULL OR status = $2) \
             ORDER BY created_at DESC, row_seq DESC \
             LIMIT $3 OFFSET $4"
        );

        let rows = sqlx::query_as::<_, Account>(&sql)
            .bind(tenant)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.scope.executor())
            .await?;

        Ok(rows)
    }

    /// Every account of the tenant in insertion order, fetched lazily.
    pub fn stream(self) -> BoxStream<'s, Result<Account, sqlx::Error>> {
        let scope = self.scope;
        let tenant = scope.tenant().as_uuid();
        sqlx::query_as::<_, Account>(
            "SELECT id, owner_user_id, name, industry, website, phone, status, memo, \
                    created_at, updated_at \
             FROM accounts WHERE tenant_id = $1 ORDER BY row_seq",
        )
        .bind(tenant)
        .fetch(scope.executor())
    }
}
