//! Integration connection and event repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{DbError, TenantScope};
use crate::models::{
    ConnectionUpsert, IntegrationProvider, IntegrationStatus, IntegrationType,
    NewIntegrationEvent, Pagination,
};

// Tokens are write-only: never part of a projection.
const CONNECTION_COLUMNS: &str = "id, user_id, provider, integration_type, external_account_id, \
     status, scopes, expires_at, updated_at";

const EVENT_COLUMNS: &str = "id, provider, integration_type, external_event_id, event_type, \
     payload, linked_account_id, linked_contact_id, linked_opportunity_id, occurred_at";

/// Connection record without credentials
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationConnection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: IntegrationProvider,
    pub integration_type: IntegrationType,
    pub external_account_id: String,
    pub status: IntegrationStatus,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Event record from database
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationEvent {
    pub id: Uuid,
    pub provider: IntegrationProvider,
    pub integration_type: IntegrationType,
    pub external_event_id: Option<String>,
    pub event_type: String,
    pub payload: JsonValue,
    pub linked_account_id: Option<Uuid>,
    pub linked_contact_id: Option<Uuid>,
    pub linked_opportunity_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

/// Integration repository
pub struct IntegrationRepo<'s> {
    scope: &'s mut TenantScope,
}

impl<'s> IntegrationRepo<'s> {
    pub fn new(scope: &'s mut TenantScope) -> Self {
        Self { scope }
    }

    /// Insert or update the connection for (user, provider, type).
    ///
    /// Status and tokens that are absent keep their stored value on update.
    pub async fn upsert_connection(
        &mut self,
        input: &ConnectionUpsert,
    ) -> Result<IntegrationConnection, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "INSERT INTO integration_connections AS c \
                 (tenant_id, user_id, provider, integration_type, external_account_id, status, \
                  access_token, refresh_token, expires_at, scopes) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'active'::integration_status), \
                     $7, $8, $9, $10) \
             ON CONFLICT (tenant_id, user_id, provider, integration_type) DO UPDATE SET \
                 external_account_id = EXCLUDED.external_account_id, \
                 status = COALESCE($6, c.status), \
                 access_token = COALESCE(EXCLUDED.access_token, c.access_token), \
                 refresh_token = COALESCE(EXCLUDED.refresh_token, c.refresh_token), \
                 expires_at = EXCLUDED.expires_at, \
                 scopes = EXCLUDED.scopes, \
                 updated_at = now() \
             RETURNING {CONNECTION_COLUMNS}"
        );

        let row = sqlx::query_as::<_, IntegrationConnection>(&sql)
            .bind(tenant)
            .bind(input.user_id)
            .bind(input.provider)
            .bind(input.integration_type)
            .bind(&input.external_account_id)
            .bind(input.status)
            .bind(input.access_token.as_deref())
            .bind(input.refresh_token.as_deref())
            .bind(input.expires_at)
            .bind(&input.scopes)
            .fetch_one(self.scope.executor())
            .await?;

        Ok(row)
    }

    /// Most recently updated first.
    pub async fn list_connections(
        &mut self,
        page: Pagination,
    ) -> Result<Vec<IntegrationConnection>, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "SELECT {CONNECTION_COLUMNS} FROM integration_connections \
             WHERE tenant_id = $1 ORDER BY updated_at DESC, id \
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query_as::<_, IntegrationConnection>(&sql)
            .bind(tenant)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.scope.executor())
            .await?;

        Ok(rows)
    }

    pub async fn create_event(
        &mut self,
        input: &NewIntegrationEvent,
    ) -> Result<IntegrationEvent, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "INSERT INTO integration_events \
                 (tenant_id, provider, integration_type, external_event_id, event_type, payload, \
                  linked_account_id, linked_contact_id, linked_opportunity_id, occurred_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {EVENT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, IntegrationEvent>(&sql)
            .bind(tenant)
            .bind(input.provider)
            .bind(input.integration_type)
            .bind(input.external_event_id.as_deref())
            .bind(&input.event_type)
            .bind(&input.payload)
            .bind(input.linked_account_id)
            .bind(input.linked_contact_id)
            .bind(input.linked_opportunity_id)
            .bind(input.occurred_at)
            .fetch_one(self.scope.executor())
            .await?;

        Ok(row)
    }

    /// Newest occurrence first.
    pub async fn list_events(&mut self, page: Pagination) -> Result<Vec<IntegrationEvent>, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM integration_events \
             WHERE tenant_id = $1 ORDER BY occurred_at DESC, id \
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query_as::<_, IntegrationEvent>(&sql)
            .bind(tenant)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.scope.executor())
            .await?;

        Ok(rows)
    }
}
