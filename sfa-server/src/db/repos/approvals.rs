//! Approval request repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{DbError, TenantScope};
use crate::models::{ApprovalDecision, ApprovalStatus, NewApprovalRequest, Pagination};

const APPROVAL_COLUMNS: &str = "id, entity_type, entity_id, requested_by, approver_user_id, \
     status, reason, decision_note, decided_at, created_at";

/// Approval request record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub requested_by: Uuid,
    pub approver_user_id: Uuid,
    pub status: ApprovalStatus,
    pub reason: String,
    pub decision_note: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Approval repository
pub struct ApprovalRepo<'s> {
    scope: &'s mut TenantScope,
}

impl<'s> ApprovalRepo<'s> {
    pub fn new(scope: &'s mut TenantScope) -> Self {
        Self { scope }
    }

    /// New requests always start as `pending`.
    pub async fn create(&mut self, input: &NewApprovalRequest) -> Result<ApprovalRequest, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "INSERT INTO approval_requests \
                 (tenant_id, entity_type, entity_id, requested_by, approver_user_id, reason) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {APPROVAL_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ApprovalRequest>(&sql)
            .bind(tenant)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(input.requested_by)
            .bind(input.approver_user_id)
            .bind(&input.reason)
            .fetch_one(self.scope.executor())
            .await?;

        Ok(row)
    }

    /// Newest first, optionally filtered by status.
    pub async fn list(
        &mut self,
        status: Option<ApprovalStatus>,
        page: Pagination,
    ) -> Result<Vec<ApprovalRequest>, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "SELECT {APPROVAL_COLUMNS} FROM approval_requests \
             WHERE tenant_id = $1 AND ($2::approval_status IS NULL OR status = $2) \
             ORDER BY created_at DESC, id \
             LIMIT $3 OFFSET $4"
        );

        let rows = sqlx::query_as::<_, ApprovalRequest>(&sql)
            .bind(tenant)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.scope.executor())
            .await?;

        Ok(rows)
    }

    /// Record a decision. Returns `NotFound` when the id does not exist for
    /// the tenant.
    pub async fn decide(
        &mut self,
        id: Uuid,
        decision: &ApprovalDecision,
    ) -> Result<ApprovalRequest, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "UPDATE approval_requests \
             SET status = $3, decision_note = $4, decided_at = now() \
             WHERE tenant_id = $1 AND id = $2 \
             RETURNING {APPROVAL_COLUMNS}"
        );

        sqlx::query_as::<_, ApprovalRequest>(&sql)
            .bind(tenant)
            .bind(id)
            .bind(decision.status)
            .bind(decision.note.as_deref())
            .fetch_optional(self.scope.executor())
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "approval_request",
                id: id.to_string(),
            })
    }
}
