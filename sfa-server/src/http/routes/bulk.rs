//! CSV import and export endpoints

use std::io;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderName, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, StreamExt};

use crate::bulk::import::import;
use crate::bulk::{CsvTable, Entity, ExportHandle, ImportReport, EXPORT_VERSION};
use crate::http::error::ApiError;
use crate::http::extractors::Tenant;
use crate::http::server::AppState;
use crate::models::TenantId;

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

static EXPORT_VERSION_HEADER: HeaderName = HeaderName::from_static("x-export-version");

async fn export_accounts(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
) -> Result<impl IntoResponse, ApiError> {
    export_csv(state, tenant, Entity::Accounts).await
}

async fn export_opportunities(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
) -> Result<impl IntoResponse, ApiError> {
    export_csv(state, tenant, Entity::Opportunities).await
}

/// Stream every row of `entity` as CSV.
///
/// Failures before the header is produced are returned as a normal error
/// response. Later failures cut the body short; the status line has already
/// been sent by then.
async fn export_csv(
    state: Arc<AppState>,
    tenant: TenantId,
    entity: Entity,
) -> Result<impl IntoResponse, ApiError> {
    let deadline = tokio::time::Instant::now() + state.config.export_timeout;
    let mut handle = ExportHandle::spawn(state.guard.clone(), tenant, entity, deadline);

    let first = handle.next_chunk().await?.ok_or_else(|| ApiError::Internal {
        message: format!("{entity} export finished without a header"),
    })?;

    let rest = stream::unfold(Some(handle), |handle| async move {
        let mut handle = handle?;
        match handle.next_chunk().await {
            Ok(Some(chunk)) => Some((Ok(chunk), Some(handle))),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, "export aborted mid-stream");
                Some((Err(io::Error::other(e.to_string())), None))
            }
        }
    });
    let body = Body::from_stream(stream::once(async move { Ok::<_, io::Error>(first) }).chain(rest));

    let headers = [
        (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename={}", entity.file_name()),
        ),
        (EXPORT_VERSION_HEADER.clone(), EXPORT_VERSION.to_owned()),
    ];
    Ok((headers, body))
}

async fn import_accounts(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    req: Request,
) -> Result<Json<ImportReport>, ApiError> {
    import_csv(state, tenant, Entity::Accounts, req).await
}

async fn import_opportunities(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    req: Request,
) -> Result<Json<ImportReport>, ApiError> {
    import_csv(state, tenant, Entity::Opportunities, req).await
}

async fn import_csv(
    state: Arc<AppState>,
    tenant: TenantId,
    entity: Entity,
    req: Request,
) -> Result<Json<ImportReport>, ApiError> {
    let upload = read_upload(req, &state).await?;
    let table = CsvTable::parse(&upload).map_err(|e| ApiError::invalid_csv(e.to_string()))?;

    let deadline = tokio::time::Instant::now() + state.config.import_timeout;
    let report = import(&state.guard, tenant, entity, table, deadline).await?;
    Ok(Json(report))
}

/// Raw body, or the `file` field of a multipart form.
async fn read_upload(req: Request, state: &Arc<AppState>) -> Result<Bytes, ApiError> {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        return Bytes::from_request(req, state)
            .await
            .map_err(|e| upload_error(e.status(), e.body_text()));
    }

    let mut form = Multipart::from_request(req, state)
        .await
        .map_err(|e| upload_error(e.status(), e.body_text()))?;

    while let Some(field) = form
        .next_field()
        .await
        .map_err(|e| upload_error(e.status(), e.body_text()))?
    {
        if field.name() == Some(FILE_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| upload_error(e.status(), e.body_text()));
        }
    }

    Err(ApiError::invalid_csv("multipart body has no 'file' field"))
}

fn upload_error(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::invalid_csv(message)
    }
}

/// Bulk routes; uploads are capped at `import_limit` bytes.
pub fn router(import_limit: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/export/accounts.csv", get(export_accounts))
        .route("/export/opportunities.csv", get(export_opportunities))
        .route("/import/accounts.csv", post(import_accounts))
        .route("/import/opportunities.csv", post(import_opportunities))
        .layer(DefaultBodyLimit::max(import_limit))
}
