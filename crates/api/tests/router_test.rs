//! Router tests for authentication, authorization and request validation.
//!
//! The state uses a disconnected database, so every case here must be
//! answered before a query is issued.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use contta_api::{AppState, create_router};
use contta_core::webhook::sign;
use contta_shared::config::{
    AiConfig, AppConfig, ChartConfig, DatabaseConfig, JwtSettings, ServerConfig, StripeConfig,
};
use contta_shared::{JwtConfig, JwtService, Role};
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

const JWT_SECRET: &str = "router-test-secret";
const WEBHOOK_SECRET: &str = "whsec_router_test";

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtSettings {
            secret: JWT_SECRET.to_string(),
            access_token_expiry_secs: 900,
        },
        ai: AiConfig::default(),
        stripe: StripeConfig {
            webhook_secret: WEBHOOK_SECRET.to_string(),
            ..StripeConfig::default()
        },
        chart: ChartConfig::default(),
    }
}

fn app() -> Router {
    let state = AppState::new(DatabaseConnection::Disconnected, test_config(), None).unwrap();
    create_router(state)
}

fn token(tenant_id: Uuid, role: Role) -> String {
    JwtService::new(JwtConfig {
        secret: JWT_SECRET.to_string(),
        access_token_expires_minutes: 15,
    })
    .generate_access_token(Uuid::new_v4(), tenant_id, role)
    .unwrap()
}

fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_is_public() {
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let tenant = Uuid::new_v4();
    let request = Request::builder()
        .uri(format!("/api/v1/tenants/{tenant}/closings"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let tenant = Uuid::new_v4();
    let request = authed("GET", &format!("/api/v1/tenants/{tenant}/clients"), "not-a-jwt", None);
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn other_tenant_is_forbidden() {
    let own = Uuid::new_v4();
    let other = Uuid::new_v4();
    let request = authed(
        "GET",
        &format!("/api/v1/tenants/{other}/invoices"),
        &token(own, Role::Owner),
        None,
    );
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn viewer_cannot_write() {
    let tenant = Uuid::new_v4();
    let request = authed(
        "POST",
        &format!("/api/v1/tenants/{tenant}/clients"),
        &token(tenant, Role::Viewer),
        Some(serde_json::json!({"name": "Padaria Pão Quente", "document": "11222333000181"})),
    );
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_role");
}

#[tokio::test]
async fn assistant_cannot_sign_off() {
    let tenant = Uuid::new_v4();
    let request = authed(
        "POST",
        &format!("/api/v1/tenants/{tenant}/closings/2025-01/sign-off"),
        &token(tenant, Role::Assistant),
        None,
    );
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_role");
}

#[tokio::test]
async fn accountant_cannot_reopen() {
    let tenant = Uuid::new_v4();
    let request = authed(
        "POST",
        &format!("/api/v1/tenants/{tenant}/closings/2025-01/reopen"),
        &token(tenant, Role::Accountant),
        None,
    );
    let (status, _) = send(request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_period_is_bad_request() {
    let tenant = Uuid::new_v4();
    let request = authed(
        "GET",
        &format!("/api/v1/tenants/{tenant}/closings/2025-13"),
        &token(tenant, Role::Viewer),
        None,
    );
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_period");
}

#[tokio::test]
async fn unsupported_statement_format_is_bad_request() {
    let tenant = Uuid::new_v4();
    let request = authed(
        "POST",
        &format!("/api/v1/tenants/{tenant}/bank-transactions/import"),
        &token(tenant, Role::Assistant),
        Some(serde_json::json!({"format": "xlsx", "content": "whatever"})),
    );
    let (status, _) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_without_signature_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/stripe")
        .body(Body::from(r#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#))
        .unwrap();
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_signature");
}

#[tokio::test]
async fn webhook_with_wrong_signature_is_bad_request() {
    let payload = r#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#;
    let now = Utc::now().timestamp();
    let forged = sign(payload, now, "whsec_someone_else").unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/stripe")
        .header("Stripe-Signature", format!("t={now},v1={forged}"))
        .body(Body::from(payload))
        .unwrap();
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_signature");
}

#[tokio::test]
async fn webhook_signed_but_not_an_event_is_bad_request() {
    let payload = r#"{"hello":"world"}"#;
    let now = Utc::now().timestamp();
    let signature = sign(payload, now, WEBHOOK_SECRET).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/stripe")
        .header("Stripe-Signature", format!("t={now},v1={signature}"))
        .body(Body::from(payload))
        .unwrap();
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_payload");
}

#[test]
fn out_of_range_min_confidence_is_rejected() {
    let mut config = test_config();
    config.ai.min_confidence = "1.5".to_string();
    assert!(AppState::new(DatabaseConnection::Disconnected, config, None).is_err());
}

#[tokio::test]
async fn report_range_must_not_be_inverted() {
    let tenant = Uuid::new_v4();
    let request = authed(
        "GET",
        &format!("/api/v1/tenants/{tenant}/reports/income-statement?from=2025-02-01&to=2025-01-31"),
        &token(tenant, Role::Viewer),
        None,
    );
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_range");
}

#[tokio::test]
async fn report_range_is_required() {
    let tenant = Uuid::new_v4();
    let request = authed(
        "GET",
        &format!("/api/v1/tenants/{tenant}/reports/ledger/1.1.1.05?from=2025-01-01"),
        &token(tenant, Role::Viewer),
        None,
    );
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_range");
}

#[tokio::test]
async fn ledger_rejects_malformed_account_code() {
    let tenant = Uuid::new_v4();
    let request = authed(
        "GET",
        &format!("/api/v1/tenants/{tenant}/reports/ledger/1.1.%25?period=2025-01"),
        &token(tenant, Role::Viewer),
        None,
    );
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_account_code");
}

#[tokio::test]
async fn trial_balance_rejects_bad_period() {
    let tenant = Uuid::new_v4();
    let request = authed(
        "GET",
        &format!("/api/v1/tenants/{tenant}/reports/trial-balance?period=%2B202-01"),
        &token(tenant, Role::Viewer),
        None,
    );
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_period");
}
