use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::Duration;
use sea_orm::DatabaseConnection;
use serde_json::Value;

use warden_auth_types::cookie::WARDEN_DEVICE_ID;
use warden_testing::auth::MockAuth;
use warden_trust::infra::events::EventSinkKind;
use warden_trust::router::build_router;
use warden_trust::state::AppState;

/// Router over a disconnected database: only paths that fail before storage
/// is touched can be exercised here.
fn server() -> TestServer {
    let state = AppState {
        db: DatabaseConnection::Disconnected,
        cookie_domain: "example.com".to_owned(),
        code_ttl: Duration::seconds(600),
        expose_lock_codes: false,
        event_sink: EventSinkKind::Log,
    };
    TestServer::new(build_router(state)).unwrap()
}

fn with_identity(
    mut request: axum_test::TestRequest,
    auth: &MockAuth,
) -> axum_test::TestRequest {
    for (name, value) in auth.headers().iter() {
        request = request.add_header(name.clone(), value.clone());
    }
    request
}

#[tokio::test]
async fn should_report_liveness() {
    let response = server().get("/healthz").await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn should_report_not_ready_without_database() {
    let response = server().get("/readyz").await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn should_reject_requests_without_identity() {
    let server = server();

    assert_eq!(server.get("/sessions").await.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(server.get("/devices").await.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_reject_malformed_session_id() {
    let server = server();
    let auth = MockAuth::user();

    let response = with_identity(server.get("/sessions/not-a-uuid"), &auth).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn should_report_missing_current_device_without_cookie() {
    let server = server();
    let auth = MockAuth::user();

    let response = with_identity(server.get("/devices/current"), &auth).await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["kind"], "DEVICE_NOT_FOUND");
    assert_eq!(body["message"], "device not found");
}

#[tokio::test]
async fn should_report_missing_current_device_for_malformed_cookie() {
    let server = server();
    let auth = MockAuth::user();

    let response = with_identity(server.get("/devices/current"), &auth)
        .add_header(
            HeaderName::from_static("cookie"),
            HeaderValue::from_str(&format!("{WARDEN_DEVICE_ID}=garbage")).unwrap(),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_attach_request_id() {
    let response = server().get("/healthz").await;

    assert!(response.headers().contains_key("x-request-id"));
}
