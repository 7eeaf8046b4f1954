//! Account endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Deserialize;

use super::{cell, DataResponse, ListResponse};
use crate::db::{Account, AccountRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, Tenant, ValidUuid};
use crate::http::server::AppState;
use crate::models::{
    AccountStatus, NewAccount, Pagination, PaginationParams, RawAccount, ValidationError,
    Vocabulary,
};

/// Query string for GET /accounts
#[derive(Debug, Default, Deserialize)]
pub struct ListAccountsQuery {
    #[serde(flatten)]
    pub page: PaginationParams,
    pub status: Option<String>,
}

/// Create account request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub owner_user_id: Option<String>,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
    pub memo: Option<String>,
}

impl CreateAccountRequest {
    fn validate(&self) -> Result<NewAccount, ValidationError> {
        let raw = RawAccount {
            owner_user_id: cell(&self.owner_user_id),
            name: cell(&self.name),
            industry: cell(&self.industry),
            website: cell(&self.website),
            phone: cell(&self.phone),
            status: cell(&self.status),
            memo: cell(&self.memo),
        };
        if let Some(field) = raw.missing().first() {
            return Err(ValidationError::Empty { field });
        }
        NewAccount::parse(raw)
    }
}

/// GET /accounts - list accounts, newest first
async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<ListResponse<Account>>, ApiError> {
    let page = Pagination::from(&query.page);
    let status = AccountStatus::parse_optional(cell(&query.status))?;

    let accounts = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { AccountRepo::new(scope).list(status, page).await })
        })
        .await?;

    Ok(Json(ListResponse::new(accounts, page)))
}

/// POST /accounts - create one account
async fn create_account(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    JsonBody(req): JsonBody<CreateAccountRequest>,
) -> Result<(StatusCode, Json<DataResponse<Account>>), ApiError> {
    let input = req.validate()?;

    let account = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { AccountRepo::new(scope).create(&input).await })
        })
        .await?;

    tracing::info!(%tenant, account_id = %account.id, "account created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(account))))
}

/// GET /accounts/{id} - one account of the tenant
async fn get_account(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    ValidUuid(id): ValidUuid,
) -> Result<Json<DataResponse<Account>>, ApiError> {
    let account = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { AccountRepo::new(scope).get(id).await })
        })
        .await?;

    Ok(Json(DataResponse::new(account)))
}

/// Account routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{id}", get(get_account))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_owner_is_reported_first() {
        let req = CreateAccountRequest {
            name: Some("Acme".into()),
            ..Default::default()
        };
        let err = req.validate().unwrap_err();
        assert_eq!(err.code(), "missing_owner_user_id");
    }

    #[test]
    fn create_request_uses_camel_case() {
        let req: CreateAccountRequest = serde_json::from_str(
            r#"{"ownerUserId":"11111111-1111-1111-1111-111111111111","name":"Acme","status":"active"}"#,
        )
        .unwrap();
        let account = req.validate().unwrap();
        assert_eq!(account.status, AccountStatus::Active);
    }
}
