//! HTTP Surface
//!
//! `GET /healthz` answers `ok`. `GET /db/ping` runs one full bootstrap,
//! executes `select 1` and reports `db: 1`; any failure becomes a 500 with
//! the error text as body.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::bootstrap::Bootstrap;
use crate::core::HttpTransport;
use crate::database::{DatabaseSession, PostgresConnector};

/// Shared router state.
pub struct AppState<T: HttpTransport, C: PostgresConnector> {
    pub bootstrap: Arc<Bootstrap<T, C>>,
    /// Parent of every per-request cancellation token.
    pub shutdown: CancellationToken,
    /// Upper bound for one `/db/ping` bootstrap.
    pub request_deadline: Duration,
}

impl<T: HttpTransport, C: PostgresConnector> Clone for AppState<T, C> {
    fn clone(&self) -> Self {
        Self {
            bootstrap: self.bootstrap.clone(),
            shutdown: self.shutdown.clone(),
            request_deadline: self.request_deadline,
        }
    }
}

/// Build the service router.
pub fn router<T, C>(state: AppState<T, C>) -> Router
where
    T: HttpTransport + 'static,
    C: PostgresConnector + 'static,
{
    Router::new()
        .route("/healthz", get(healthz))
        .route("/db/ping", get(db_ping::<T, C>))
        .with_state(state)
}

/// Liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}

async fn db_ping<T, C>(State(state): State<AppState<T, C>>) -> Response
where
    T: HttpTransport + 'static,
    C: PostgresConnector + 'static,
{
    let cancel = state.shutdown.child_token();
    // Client disconnects drop this future; the guard cancels any stragglers.
    let _guard = cancel.clone().drop_guard();

    let connection = match state
        .bootstrap
        .establish_connection_with_deadline(&cancel, state.request_deadline)
        .await
    {
        Ok(connection) => connection,
        Err(e) => {
            error!(code = e.error_code(), error = %e, "database bootstrap failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    match connection.ping().await {
        Ok(one) => {
            info!("database ping succeeded");
            format!("db: {}", one).into_response()
        }
        Err(e) => {
            error!(error = %e, "database ping failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
