//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing and request timeout middleware (bulk routes carry their own
//!   deadlines instead)
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, StatusCode};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::db::TenantGuard;

/// Default upload limit for CSV imports.
pub const DEFAULT_IMPORT_LIMIT: usize = 32 * 1024 * 1024;

/// Origins allowed when CORS is not permissive.
const LOCAL_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    /// Only use for development or documented use cases.
    pub cors_permissive: bool,

    /// Time allowed to produce a response (default: 30s)
    pub request_timeout: Duration,

    /// Largest accepted import body in bytes (default: 32 MiB)
    pub import_limit: usize,

    /// Deadline for a whole CSV import (default: 10 min)
    pub import_timeout: Duration,

    /// Deadline for a whole CSV export, body included (default: 10 min)
    pub export_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cors_permissive: false,
            request_timeout: Duration::from_secs(30),
            import_limit: DEFAULT_IMPORT_LIMIT,
            import_timeout: Duration::from_secs(600),
            export_timeout: Duration::from_secs(600),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub guard: TenantGuard,
    pub config: ServerConfig,
}

/// Build the full router. Split from [`run_server`] so tests can drive it
/// without a listener.
pub fn build_router(guard: TenantGuard, config: ServerConfig) -> Router {
    let cors = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = LOCAL_ORIGINS
            .iter()
            .copied()
            .map(HeaderValue::from_static)
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let timeout = request_timeout_layer(config.request_timeout);
    let api = Router::new()
        .merge(routes::health::api_router())
        .merge(routes::accounts::router())
        .merge(routes::opportunities::router())
        .merge(routes::integrations::router())
        .merge(routes::approvals::router())
        .layer(timeout.clone())
        .merge(routes::bulk::router(config.import_limit));

    let state = AppState { guard, config };

    Router::new()
        .merge(routes::health::router().layer(timeout))
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Answers 408 when a handler runs past `timeout`.
pub(crate) fn request_timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Run the HTTP server.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool(&PoolConfig::default()).await?;
/// let guard = TenantGuard::new(pool, Duration::from_secs(30));
/// run_server(guard, ServerConfig::default()).await?;
/// ```
pub async fn run_server(guard: TenantGuard, config: ServerConfig) -> Result<(), ServerError> {
    let bind_addr = config.bind_addr;
    let app = build_router(guard, config);

    // Bind listener
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    // Run with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(!config.cors_permissive);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.import_limit, 32 * 1024 * 1024);
        assert_eq!(config.import_timeout, Duration::from_secs(600));
        assert_eq!(config.export_timeout, Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_gets_request_timeout() {
        use axum::body::Body;
        use axum::http::{Request, Response};
        use tower::{service_fn, ServiceBuilder, ServiceExt};

        let service = ServiceBuilder::new()
            .layer(request_timeout_layer(Duration::from_millis(50)))
            .service(service_fn(|_req: Request<Body>| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
            }));

        let response = service
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
