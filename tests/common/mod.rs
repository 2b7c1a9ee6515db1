//! Shared helpers for integration tests against a mocked Vault.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use integrations_vault_database::{
    BackoffPolicy, Bootstrap, DatabaseConfig, MockPostgresConnector, ReqwestHttpTransport,
    VaultConfig,
};

pub const ROLE_ID: &str = "role-id-123";
pub const SECRET_ID: &str = "secret-id-456";

/// Short backoff so real-time retries stay fast.
pub fn fast_backoff() -> BackoffPolicy {
    BackoffPolicy::new(Duration::from_millis(5), 5)
}

pub fn login_success(token: &str) -> Value {
    json!({
        "auth": {
            "client_token": token,
            "accessor": "acc",
            "policies": ["default", "app-db"],
            "lease_duration": 2764800,
            "renewable": true
        }
    })
}

pub fn creds_success(username: &str, password: &str) -> Value {
    json!({
        "request_id": "f3c2",
        "lease_id": "database/creds/app-role/xyz",
        "lease_duration": 3600,
        "renewable": true,
        "data": {"username": username, "password": password}
    })
}

/// Login mock matching the AppRole body.
pub fn mock_login(response: ResponseTemplate) -> Mock {
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_json(json!({"role_id": ROLE_ID, "secret_id": SECRET_ID})))
        .respond_with(response)
}

/// Credential mock requiring the token header.
pub fn mock_creds(token: &str, response: ResponseTemplate) -> Mock {
    Mock::given(method("GET"))
        .and(path("/v1/database/creds/app-role"))
        .and(header("X-Vault-Token", token))
        .respond_with(response)
}

pub fn bootstrap(
    server: &MockServer,
    connector: &Arc<MockPostgresConnector>,
) -> Bootstrap<ReqwestHttpTransport, Arc<MockPostgresConnector>> {
    Bootstrap::new(
        VaultConfig::new(server.uri(), ROLE_ID, SECRET_ID),
        DatabaseConfig::default(),
        fast_backoff(),
        Arc::new(ReqwestHttpTransport::new().expect("transport")),
        connector.clone(),
    )
}
