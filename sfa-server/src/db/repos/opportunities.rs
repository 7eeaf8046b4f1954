//! Opportunity repository
//!
//! Handles opportunity writes with:
//! - Insert without the follow-up fields
//! - Next-action update as a separate, id-targeted statement
//! - Due-ordered next-action listing joined with the account name

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::BoxStream;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{DbError, TenantScope};
use crate::models::{wire, NewOpportunity, NextAction, OpportunityStage, Pagination};

const OPPORTUNITY_COLUMNS: &str = "id, account_id, contact_id, owner_user_id, name, stage, \
     probability, amount, expected_close_date, next_action_at, next_action_note, \
     created_at, updated_at";

/// Opportunity record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: Uuid,
    pub account_id: Uuid,
    pub contact_id: Option<Uuid>,
    pub owner_user_id: Uuid,
    pub name: String,
    pub stage: OpportunityStage,
    pub probability: i16,
    #[serde(serialize_with = "wire::serialize_amount")]
    pub amount: BigDecimal,
    pub expected_close_date: Option<NaiveDate>,
    pub next_action_at: Option<DateTime<Utc>>,
    pub next_action_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the next-action work list
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextActionItem {
    pub id: Uuid,
    pub name: String,
    pub stage: OpportunityStage,
    pub account_name: String,
    pub next_action_at: DateTime<Utc>,
    pub next_action_note: Option<String>,
}

/// Opportunity repository
pub struct OpportunityRepo<'s> {
    scope: &'s mut TenantScope,
}

impl<'s> OpportunityRepo<'s> {
    pub fn new(scope: &'s mut TenantScope) -> Self {
        Self { scope }
    }

    /// Insert the opportunity itself. `input.next_action` is not written
    /// here; see [`set_next_action`](Self::set_next_action).
    pub async fn create(&mut self, input: &NewOpportunity) -> Result<Opportunity, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "INSERT INTO opportunities \
                 (tenant_id, account_id, contact_id, owner_user_id, name, stage, \
                  probability, amount, expected_close_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {OPPORTUNITY_COLUMNS}"
        );

        let opportunity = sqlx::query_as::<_, Opportunity>(&sql)
            .bind(tenant)
            .bind(input.account_id)
            .bind(input.contact_id)
            .bind(input.owner_user_id)
            .bind(&input.name)
            .bind(input.stage)
            .bind(input.probability)
            .bind(&input.amount)
            .bind(input.expected_close_date)
            .fetch_one(self.scope.executor())
            .await?;

        Ok(opportunity)
    }

    /// Set the follow-up on one opportunity.
    ///
    /// Returns `NotFound` when no opportunity with this id exists for the
    /// tenant.
    pub async fn set_next_action(
        &mut self,
        id: Uuid,
        action: &NextAction,
    ) -> Result<Opportunity, DbError> {
        let tenant = self.scope.tenant().as_uuid();
        let sql = format!(
            "UPDATE opportunities \
             SET next_action_at = $3, next_action_note = $4, updated_at = now() \
             WHERE tenant_id = $1 AND id = $2 \
             RETURNING {OPPORTUNITY_COLUMNS}"
        );

        sqlx::query_as::<_, Opportunity>(&sql)
            .bind(tenant)
            .bind(id)
            .bind(action.at)
            .bind(action.note.as_deref())
            .fetch_optional(self.scope.executor())
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "opportunity",
                id: id.to_string(),
            })
    }

    /// Opportunities with a scheduled follow-up, soonest first.
    pub async fn list_next_actions(
        &mut self,
        due_before: Option<DateTime<Utc>>,
        page: Pagination,
    ) -> Result<Vec<NextActionItem>, DbError> {
        let tenant = self.scope.tenant().as_uuid();

        let rows = sqlx::query_as::<_, NextActionItem>(
            r#"
            SELECT o.id, o.name, o.stage, a.name AS account_name,
                   o.next_action_at, o.next_action_note
            FROM opportunities o
            JOIN accounts a ON a.tenant_id = o.tenant_id AND a.id = o.account_id
            WHERE o.tenant_id = $1
              AND o.next_action_at IS NOT NULL
              AND ($2::timestamptz IS NULL OR o.next_action_at <= $2)
            ORDER BY o.next_action_at ASC, o.row_seq ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant)
        .bind(due_before)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.scope.executor())
        .await?;

        Ok(rows)
    }

    /// Every opportunity of the tenant in insertion order, fetched lazily.
    pub fn stream(self) -> BoxStream<'s, Result<Opportunity, sqlx::Error>> {
        let scope = self.scope;
        let tenant = scope.tenant().as_uuid();
        sqlx::query_as::<_, Opportunity>(
            "SELECT id, account_id, contact_id, owner_user_id, name, stage, probability, amount, \
                    expected_close_date, next_action_at, next_action_note, created_at, updated_at \
             FROM opportunities WHERE tenant_id = $1 ORDER BY row_seq",
        )
        .bind(tenant)
        .fetch(scope.executor())
    }
}
