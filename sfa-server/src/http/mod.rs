//! HTTP layer
//!
//! Axum server with:
//! - Tenant identity from `X-Tenant-ID`, rejected before any storage access
//! - CORS (localhost only by default)
//! - Request tracing and timeouts
//! - JSON error responses

pub mod server;
pub mod error;
pub mod extractors;
pub mod routes;

pub use server::{build_router, run_server, AppState, ServerConfig, ServerError};
pub use error::ApiError;
