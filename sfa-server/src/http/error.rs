//! API error types with IntoResponse
//!
//! Every failure is rendered as `{"error": {"code", "message"}}` with a
//! status derived from its class. Only unexpected storage or internal
//! failures become `internal_error`; their detail is logged, not returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::DbError;
use crate::models::{TenantError, ValidationError};

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed tenant header (400)
    InvalidTenant(TenantError),

    /// Field validation failed (400)
    Validation(ValidationError),

    /// Unreadable body, or a write rejected by a table constraint (400)
    BadRequest { code: &'static str, message: String },

    /// Upload exceeds the configured limit (413)
    PayloadTooLarge,

    /// Targeted row does not exist for this tenant (404)
    NotFound { resource: &'static str, id: String },

    /// Unit of work ran past its deadline (504)
    Timeout,

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: "invalid_json",
            message: message.into(),
        }
    }

    pub fn invalid_csv(message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: "invalid_csv",
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidTenant(_) | Self::Validation(_) | Self::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> String {
        match self {
            Self::InvalidTenant(_) => "invalid_tenant_id".to_owned(),
            Self::Validation(e) => e.code(),
            Self::BadRequest { code, .. } => (*code).to_owned(),
            Self::PayloadTooLarge => "payload_too_large".to_owned(),
            Self::NotFound { .. } => "not_found".to_owned(),
            Self::Timeout => "timeout".to_owned(),
            Self::Database(_) | Self::Internal { .. } => "internal_error".to_owned(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::InvalidTenant(e) => e.to_string(),
            Self::Validation(e) => e.to_string(),
            Self::BadRequest { message, .. } => message.clone(),
            Self::PayloadTooLarge => "request body is too large".to_owned(),
            Self::NotFound { resource, .. } => format!("{resource} not found"),
            Self::Timeout => "operation timed out".to_owned(),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!(error = %e, "database error");
                "an internal error occurred".to_owned()
            }
            Self::Internal { message } => {
                tracing::error!(%message, "internal error");
                "an internal error occurred".to_owned()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        });

        (self.status(), Json(body)).into_response()
    }
}

impl From<TenantError> for ApiError {
    fn from(e: TenantError) -> Self {
        Self::InvalidTenant(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::DeadlineExceeded => Self::Timeout,
            _ => match e.dangling_reference() {
                Some(field) => Self::Validation(ValidationError::InvalidFormat {
                    field,
                    reason: "does not reference an existing row",
                }),
                None if e.is_statement_failure() => Self::BadRequest {
                    code: "constraint_violation",
                    message: e.reason(),
                },
                None => Self::Database(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn tenant_error_is_400() {
        let (status, body) = body_json(TenantError::Malformed.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_tenant_id");
    }

    #[tokio::test]
    async fn validation_code_names_the_field() {
        let err = ValidationError::InvalidFormat {
            field: "owner_user_id",
            reason: "must be a UUID",
        };
        let (status, body) = body_json(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_owner_user_id");
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let err = DbError::NotFound {
            resource: "opportunity",
            id: "x".into(),
        };
        let (status, body) = body_json(err.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "opportunity not found");
    }

    #[tokio::test]
    async fn deadline_is_504() {
        let (status, body) = body_json(DbError::DeadlineExceeded.into()).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["code"], "timeout");
    }

    #[tokio::test]
    async fn storage_failure_is_masked() {
        let (status, body) = body_json(DbError::Sqlx(sqlx::Error::PoolTimedOut).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], "an internal error occurred");
    }
}
