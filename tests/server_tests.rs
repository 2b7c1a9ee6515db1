//! Router tests for `/healthz` and `/db/ping`.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use wiremock::{MockServer, ResponseTemplate};

use integrations_vault_database::{router, AppState, MockPostgresConnector};

fn app(server: &MockServer, connector: &Arc<MockPostgresConnector>) -> axum::Router {
    router(AppState {
        bootstrap: Arc::new(bootstrap(server, connector)),
        shutdown: CancellationToken::new(),
        request_deadline: Duration::from_secs(5),
    })
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_healthz() {
    let server = MockServer::start().await;
    let connector = Arc::new(MockPostgresConnector::new());

    let (status, body) = get(app(&server, &connector), "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    assert_eq!(connector.attempt_count(), 0);
}

#[tokio::test]
async fn test_db_ping_success() {
    let server = MockServer::start().await;
    mock_login(ResponseTemplate::new(200).set_body_json(login_success("t1")))
        .expect(1)
        .mount(&server)
        .await;
    mock_creds("t1", ResponseTemplate::new(200).set_body_json(creds_success("u", "p")))
        .expect(1)
        .mount(&server)
        .await;
    let connector = Arc::new(MockPostgresConnector::new());

    let (status, body) = get(app(&server, &connector), "/db/ping").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "db: 1");
}

#[tokio::test]
async fn test_db_ping_forwards_login_error() {
    let server = MockServer::start().await;
    mock_login(
        ResponseTemplate::new(400)
            .set_body_json(serde_json::json!({"errors": ["invalid role or secret ID"]})),
    )
    .expect(1)
    .mount(&server)
    .await;
    let connector = Arc::new(MockPostgresConnector::new());

    let (status, body) = get(app(&server, &connector), "/db/ping").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        "AppRole login failed: 400 Bad Request: invalid role or secret ID"
    );
    assert_eq!(connector.attempt_count(), 0);
}

#[tokio::test]
async fn test_db_ping_forwards_exhausted_connect() {
    let server = MockServer::start().await;
    mock_login(ResponseTemplate::new(200).set_body_json(login_success("t1")))
        .mount(&server)
        .await;
    mock_creds("t1", ResponseTemplate::new(200).set_body_json(creds_success("u", "p")))
        .mount(&server)
        .await;
    let connector = Arc::new(MockPostgresConnector::new());
    connector.fail_always("db error: FATAL: no pg_hba.conf entry for host \"127.0.0.1\"");

    let (status, body) = get(app(&server, &connector), "/db/ping").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("database connect failed after 5 attempts"));
    assert!(body.contains("no pg_hba.conf entry"));
    assert_eq!(connector.attempt_count(), 5);
}

#[tokio::test]
async fn test_db_ping_after_shutdown_is_cancelled() {
    let server = MockServer::start().await;
    let connector = Arc::new(MockPostgresConnector::new());
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let app = router(AppState {
        bootstrap: Arc::new(bootstrap(&server, &connector)),
        shutdown,
        request_deadline: Duration::from_secs(5),
    });

    let (status, body) = get(app, "/db/ping").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "AppRole login cancelled");
}
