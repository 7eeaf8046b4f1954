//! HTTP boundary tests.
//!
//! The router runs over a pool that never connects, so every request here
//! must be answered before storage is touched.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use sfa_server::db::{create_lazy_pool, PoolConfig, TenantGuard};
use sfa_server::http::{build_router, ServerConfig};

const TENANT: &str = "0b7c3a5e-8f1d-4c2a-9e6b-3d4f5a6b7c8d";

fn app(config: ServerConfig) -> Router {
    let pool = create_lazy_pool(&PoolConfig {
        database_url: "postgresql://nobody@127.0.0.1:1/unreachable".into(),
        ..PoolConfig::default()
    })
    .unwrap();
    build_router(TenantGuard::new(pool, std::time::Duration::from_secs(1)), config)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn liveness_needs_no_tenant() {
    let (status, body) = send(
        app(ServerConfig::default()),
        Request::get("/livez").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_tenant_is_rejected() {
    let (status, body) = send(
        app(ServerConfig::default()),
        Request::get("/api/v1/accounts").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_tenant_id");
}

#[tokio::test]
async fn malformed_and_nil_tenants_are_rejected() {
    for raw in ["not-a-uuid", "00000000-0000-0000-0000-000000000000", ""] {
        let (status, body) = send(
            app(ServerConfig::default()),
            Request::get("/api/v1/export/accounts.csv")
                .header("X-Tenant-ID", raw)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "tenant {raw:?}");
        assert_eq!(error_code(&body), "invalid_tenant_id");
    }
}

#[tokio::test]
async fn invalid_json_is_rejected() {
    let (status, body) = send(
        app(ServerConfig::default()),
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/accounts")
            .header("X-Tenant-ID", TENANT)
            .header("content-type", "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_json");
}

#[tokio::test]
async fn unknown_status_filter_is_rejected() {
    let (status, body) = send(
        app(ServerConfig::default()),
        Request::get("/api/v1/accounts?status=archived")
            .header("X-Tenant-ID", TENANT)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_status");
}

#[tokio::test]
async fn invalid_path_id_is_rejected() {
    let (status, body) = send(
        app(ServerConfig::default()),
        Request::builder()
            .method(Method::PATCH)
            .uri("/api/v1/opportunities/nope/next-action")
            .header("X-Tenant-ID", TENANT)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"nextActionAt":"2024-03-01T09:00:00Z"}"#))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_id");
}

#[tokio::test]
async fn invalid_account_id_is_rejected() {
    let (status, body) = send(
        app(ServerConfig::default()),
        Request::get("/api/v1/accounts/42")
            .header("X-Tenant-ID", TENANT)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_id");
}

#[tokio::test]
async fn header_only_import_is_invalid_csv() {
    let (status, body) = send(
        app(ServerConfig::default()),
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/import/accounts.csv")
            .header("X-Tenant-ID", TENANT)
            .header("content-type", "text/csv")
            .body(Body::from("owner_user_id,name\n"))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_csv");
}

#[tokio::test]
async fn multipart_without_file_field_is_invalid_csv() {
    let boundary = "sfa-boundary";
    let form = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"other\"\r\n\r\n\
         hello\r\n\
         --{boundary}--\r\n"
    );

    let (status, body) = send(
        app(ServerConfig::default()),
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/import/opportunities.csv")
            .header("X-Tenant-ID", TENANT)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(form))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_csv");
}

#[tokio::test]
async fn oversized_import_is_payload_too_large() {
    let config = ServerConfig {
        import_limit: 64,
        ..ServerConfig::default()
    };
    let csv = format!("owner_user_id,name\n{}\n", "x,".repeat(200));

    let (status, body) = send(
        app(config),
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/import/accounts.csv")
            .header("X-Tenant-ID", TENANT)
            .header("content-type", "text/csv")
            .body(Body::from(csv))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error_code(&body), "payload_too_large");
}
