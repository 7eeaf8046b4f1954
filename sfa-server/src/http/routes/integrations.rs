//! Integration connection and event endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{cell, DataResponse, ListResponse};
use crate::db::{IntegrationConnection, IntegrationEvent, IntegrationRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, Tenant};
use crate::http::server::AppState;
use crate::models::{
    ConnectionUpsert, NewIntegrationEvent, Pagination, PaginationParams, RawConnection,
    RawIntegrationEvent, ValidationError,
};

/// Upsert connection request. Tokens are accepted here and never echoed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub user_id: Option<String>,
    pub provider: Option<String>,
    pub integration_type: Option<String>,
    pub external_account_id: Option<String>,
    pub status: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ConnectionRequest {
    fn validate(&self) -> Result<ConnectionUpsert, ValidationError> {
        ConnectionUpsert::parse(RawConnection {
            user_id: cell(&self.user_id),
            provider: cell(&self.provider),
            integration_type: cell(&self.integration_type),
            external_account_id: cell(&self.external_account_id),
            status: cell(&self.status),
            access_token: cell(&self.access_token),
            refresh_token: cell(&self.refresh_token),
            expires_at: cell(&self.expires_at),
            scopes: self.scopes.clone(),
        })
    }
}

/// Create event request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub provider: Option<String>,
    pub integration_type: Option<String>,
    pub external_event_id: Option<String>,
    pub event_type: Option<String>,
    pub payload: Option<JsonValue>,
    pub linked_account_id: Option<String>,
    pub linked_contact_id: Option<String>,
    pub linked_opportunity_id: Option<String>,
    pub occurred_at: Option<String>,
}

impl EventRequest {
    fn validate(&self) -> Result<NewIntegrationEvent, ValidationError> {
        NewIntegrationEvent::parse(RawIntegrationEvent {
            provider: cell(&self.provider),
            integration_type: cell(&self.integration_type),
            external_event_id: cell(&self.external_event_id),
            event_type: cell(&self.event_type),
            payload: self.payload.clone(),
            linked_account_id: cell(&self.linked_account_id),
            linked_contact_id: cell(&self.linked_contact_id),
            linked_opportunity_id: cell(&self.linked_opportunity_id),
            occurred_at: cell(&self.occurred_at),
        })
    }
}

/// GET /integrations/connections
async fn list_connections(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ListResponse<IntegrationConnection>>, ApiError> {
    let page = Pagination::from(&params);

    let connections = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { IntegrationRepo::new(scope).list_connections(page).await })
        })
        .await?;

    Ok(Json(ListResponse::new(connections, page)))
}

/// POST /integrations/connections - insert or update by (user, provider, type)
async fn upsert_connection(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    JsonBody(req): JsonBody<ConnectionRequest>,
) -> Result<Json<DataResponse<IntegrationConnection>>, ApiError> {
    let input = req.validate()?;

    let connection = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { IntegrationRepo::new(scope).upsert_connection(&input).await })
        })
        .await?;

    tracing::info!(
        %tenant,
        connection_id = %connection.id,
        provider = %connection.provider,
        "integration connection saved"
    );
    Ok(Json(DataResponse::new(connection)))
}

/// GET /integrations/events
async fn list_events(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ListResponse<IntegrationEvent>>, ApiError> {
    let page = Pagination::from(&params);

    let events = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { IntegrationRepo::new(scope).list_events(page).await })
        })
        .await?;

    Ok(Json(ListResponse::new(events, page)))
}

/// POST /integrations/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    JsonBody(req): JsonBody<EventRequest>,
) -> Result<(StatusCode, Json<DataResponse<IntegrationEvent>>), ApiError> {
    let input = req.validate()?;

    let event = state
        .guard
        .run(tenant, move |scope| {
            Box::pin(async move { IntegrationRepo::new(scope).create_event(&input).await })
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse::new(event))))
}

/// Integration routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/integrations/connections",
            get(list_connections).post(upsert_connection),
        )
        .route("/integrations/events", get(list_events).post(create_event))
}
