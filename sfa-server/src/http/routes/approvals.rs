//! Approval request endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::{cell, DataResponse, ListResponse};
use crate::db::{ApprovalRepo, ApprovalRequest};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, Tenant, ValidUuid};
use crate::http::server::AppState;
use crate::models::{
    ApprovalDecision, ApprovalStatus, NewApprovalRequest, Pagination, PaginationParams,
    RawApprovalRequest, ValidationError, Vocabulary,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListApprovalsQuery {
    #[serde(flatten)]
    pub page: PaginationParams,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApprovalRequest {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub requested_by: Option<String>,
    pub approver_user_id: Option<String>,
    pub reason: Option<String>,
}

impl CreateApprovalRequest {
    fn validate(&self) -> Result<NewApprovalRequest, ValidationError> {
        NewApprovalRequest::parse(RawApprovalRequest {
            entity_type: cell(&self.entity_type),
            entity_id: cell(&self.entity_id),
            requested_by: cell(&self.requested_by),
            approver_user_id: cell(&self.approver_user_id),
            reason: cell(&self.reason),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub status: Option<String>,
    pub decision_note: Option<String>,
}

/// GET /approvals
async fn list_approvals(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Query(query): Query<ListApprovalsQuery>,
) -> Result<Json<ListResponse<ApprovalRequest>>, ApiError> {
    let page = Pagination::from(&query.page);
    let status = ApprovalStatus::parse_optional(cell(&query.status))?;

    let approvals = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { ApprovalRepo::new(scope).list(status, page).await })
        })
        .await?;

    Ok(Json(ListResponse::new(approvals, page)))
}

/// POST /approvals - open a pending request
async fn create_approval(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    JsonBody(req): JsonBody<CreateApprovalRequest>,
) -> Result<(StatusCode, Json<DataResponse<ApprovalRequest>>), ApiError> {
    let input = req.validate()?;

    let approval = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { ApprovalRepo::new(scope).create(&input).await })
        })
        .await?;

    tracing::info!(%tenant, approval_id = %approval.id, "approval requested");
    Ok((StatusCode::CREATED, Json(DataResponse::new(approval))))
}

/// POST /approvals/{id}/decision
async fn decide(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    ValidUuid(id): ValidUuid,
    JsonBody(req): JsonBody<DecisionRequest>,
) -> Result<Json<DataResponse<ApprovalRequest>>, ApiError> {
    let decision = ApprovalDecision::parse(cell(&req.status), cell(&req.decision_note))?;

    let approval = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { ApprovalRepo::new(scope).decide(id, &decision).await })
        })
        .await?;

    tracing::info!(%tenant, approval_id = %id, status = %approval.status, "approval decided");
    Ok(Json(DataResponse::new(approval)))
}

/// Approval routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/approvals", get(list_approvals).post(create_approval))
        .route("/approvals/{id}/decision", post(decide))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_reports_camel_case_field() {
        let req = CreateApprovalRequest {
            entity_type: Some("opportunity".into()),
            entity_id: Some("not-a-uuid".into()),
            ..Default::default()
        };
        assert_eq!(req.validate().unwrap_err().code(), "invalid_entity_id");
    }

    #[test]
    fn decision_rejects_unknown_status() {
        let err = ApprovalDecision::parse("maybe", "").unwrap_err();
        assert_eq!(err.code(), "invalid_status");
    }
}
