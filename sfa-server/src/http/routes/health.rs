//! Liveness and readiness probes

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::http::server::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl HealthResponse {
    fn ok() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            error: None,
        }
    }
}

/// GET /livez, GET /api/v1/health
async fn live() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// GET /readyz - pings the database
async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    match sqlx::query("SELECT 1").execute(state.guard.pool()).await {
        Ok(_) => (StatusCode::OK, Json(HealthResponse::ok())),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    version: env!("CARGO_PKG_VERSION"),
                    error: Some("database_unreachable"),
                }),
            )
        }
    }
}

/// Probe routes at the root
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/livez", get(live))
        .route("/readyz", get(ready))
}

/// Health route under the API prefix
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(live))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_returns_ok() {
        let Json(body) = live().await;
        assert_eq!(body.status, "ok");
        assert_eq!(serde_json::to_value(&body).unwrap().get("error"), None);
    }
}
