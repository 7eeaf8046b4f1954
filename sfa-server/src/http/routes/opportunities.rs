//! Opportunity endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::{cell, scalar, DataResponse, ListResponse};
use crate::db::{NextActionItem, Opportunity, OpportunityRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, Tenant, ValidUuid};
use crate::http::server::AppState;
use crate::models::{
    wire, NewOpportunity, NextAction, Pagination, PaginationParams, RawOpportunity,
    ValidationError,
};

/// Create opportunity request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOpportunityRequest {
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub owner_user_id: Option<String>,
    pub name: Option<String>,
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub probability: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub amount: Option<String>,
    pub expected_close_date: Option<String>,
    pub next_action_at: Option<String>,
    pub next_action_note: Option<String>,
}

impl CreateOpportunityRequest {
    fn validate(&self) -> Result<NewOpportunity, ValidationError> {
        let raw = RawOpportunity {
            account_id: cell(&self.account_id),
            contact_id: cell(&self.contact_id),
            owner_user_id: cell(&self.owner_user_id),
            name: cell(&self.name),
            stage: cell(&self.stage),
            probability: cell(&self.probability),
            amount: cell(&self.amount),
            expected_close_date: cell(&self.expected_close_date),
            next_action_at: cell(&self.next_action_at),
            next_action_note: cell(&self.next_action_note),
        };
        if let Some(field) = raw.missing().first() {
            return Err(ValidationError::Empty { field });
        }
        NewOpportunity::parse(raw)
    }
}

/// Query string for GET /opportunities/next-actions
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextActionsQuery {
    #[serde(flatten)]
    pub page: PaginationParams,
    pub due_before: Option<String>,
}

/// Body of PATCH /opportunities/{id}/next-action
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextActionRequest {
    pub next_action_at: Option<String>,
    pub next_action_note: Option<String>,
}

/// POST /opportunities - create one opportunity and its follow-up together
async fn create_opportunity(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    JsonBody(req): JsonBody<CreateOpportunityRequest>,
) -> Result<(StatusCode, Json<DataResponse<Opportunity>>), ApiError> {
    let input = req.validate()?;

    let opportunity = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move {
                let mut repo = OpportunityRepo::new(scope);
                let created = repo.create(&input).await?;
                match &input.next_action {
                    Some(action) => repo.set_next_action(created.id, action).await,
                    None => Ok(created),
                }
            })
        })
        .await?;

    tracing::info!(%tenant, opportunity_id = %opportunity.id, "opportunity created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(opportunity))))
}

/// GET /opportunities/next-actions - scheduled follow-ups, soonest first
async fn list_next_actions(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Query(query): Query<NextActionsQuery>,
) -> Result<Json<ListResponse<NextActionItem>>, ApiError> {
    let page = Pagination::from(&query.page);
    let due_before = wire::parse_optional_timestamp(cell(&query.due_before), "due_before")?;

    let items = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move {
                OpportunityRepo::new(scope)
                    .list_next_actions(due_before, page)
                    .await
            })
        })
        .await?;

    Ok(Json(ListResponse::new(items, page)))
}

/// PATCH /opportunities/{id}/next-action
async fn set_next_action(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    ValidUuid(id): ValidUuid,
    JsonBody(req): JsonBody<NextActionRequest>,
) -> Result<Json<DataResponse<Opportunity>>, ApiError> {
    let action = NextAction::parse(
        cell(&req.next_action_at),
        cell(&req.next_action_note),
        "next_action_at",
    )?;

    let opportunity = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { OpportunityRepo::new(scope).set_next_action(id, &action).await })
        })
        .await?;

    Ok(Json(DataResponse::new(opportunity)))
}

/// Opportunity routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/opportunities", post(create_opportunity))
        .route("/opportunities/next-actions", get(list_next_actions))
        .route("/opportunities/{id}/next-action", patch(set_next_action))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "22222222-2222-2222-2222-222222222222";
    const OWNER: &str = "11111111-1111-1111-1111-111111111111";

    #[test]
    fn create_applies_defaults() {
        let req: CreateOpportunityRequest = serde_json::from_value(serde_json::json!({
            "accountId": ACCOUNT,
            "ownerUserId": OWNER,
            "name": "Renewal",
        }))
        .unwrap();

        let input = req.validate().unwrap();
        assert_eq!(input.probability, 0);
        assert_eq!(input.amount, bigdecimal::BigDecimal::from(0));
        assert!(input.next_action.is_none());
    }

    #[test]
    fn numeric_amount_is_accepted() {
        let req: CreateOpportunityRequest = serde_json::from_value(serde_json::json!({
            "accountId": ACCOUNT,
            "ownerUserId": OWNER,
            "name": "Renewal",
            "probability": 40,
            "amount": 1234.5,
        }))
        .unwrap();

        let input = req.validate().unwrap();
        assert_eq!(input.probability, 40);
        assert_eq!(crate::models::wire::render_amount(&input.amount), "1234.50");
    }

    #[test]
    fn missing_account_is_reported() {
        let req = CreateOpportunityRequest {
            owner_user_id: Some(OWNER.into()),
            name: Some("Renewal".into()),
            ..Default::default()
        };
        assert_eq!(req.validate().unwrap_err().code(), "missing_account_id");
    }

    #[test]
    fn next_action_query_reads_due_before() {
        let uri: axum::http::Uri = "/opportunities/next-actions?limit=5&dueBefore=2024-01-01T00:00:00Z"
            .parse()
            .unwrap();
        let Query(query) = Query::<NextActionsQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.due_before.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(Pagination::from(&query.page).limit, 5);
    }
}
