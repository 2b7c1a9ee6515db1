//! Postgres Connection
//!
//! Opens a Postgres connection with a dynamic credential and retries the
//! failures that [`classify_connect_error`] marks as authentication races.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio_postgres::config::SslMode;
use tokio_postgres::NoTls;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::database::classify::{classify_connect_error, ConnectFailureKind};
use crate::error::{ConnectionError, VaultDbResult};
use crate::resilience::RetryExecutor;
use crate::types::ConnectionConfig;

const OPERATION: &str = "database connect";

/// Unclassified driver failure. Only the message is inspected.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<tokio_postgres::Error> for DriverError {
    fn from(error: tokio_postgres::Error) -> Self {
        // Server-side errors carry the useful text in the DbError, not in Display.
        let message = match error.as_db_error() {
            Some(db) => format!(
                "db error: {}: {} (SQLSTATE {})",
                db.severity(),
                db.message(),
                db.code().code()
            ),
            None => error.to_string(),
        };
        Self { message }
    }
}

/// An open database session.
#[async_trait]
pub trait DatabaseSession: Send + Sync {
    /// Round-trip `select 1`.
    async fn ping(&self) -> Result<i32, DriverError>;
}

/// Opens one connection per call. Implementations must not pool or cache.
#[async_trait]
pub trait PostgresConnector: Send + Sync {
    type Connection: DatabaseSession + 'static;

    async fn open(&self, config: &ConnectionConfig) -> Result<Self::Connection, DriverError>;
}

#[async_trait]
impl<C: PostgresConnector + ?Sized> PostgresConnector for Arc<C> {
    type Connection = C::Connection;

    async fn open(&self, config: &ConnectionConfig) -> Result<Self::Connection, DriverError> {
        (**self).open(config).await
    }
}

/// Live `tokio-postgres` connection. The driver task ends when the client is dropped.
pub struct PgConnection {
    client: tokio_postgres::Client,
}

#[async_trait]
impl DatabaseSession for PgConnection {
    async fn ping(&self) -> Result<i32, DriverError> {
        let row = self.client.query_one("select 1", &[]).await?;
        Ok(row.try_get::<_, i32>(0)?)
    }
}

/// `tokio-postgres` connector.
#[derive(Debug, Clone)]
pub struct TokioPostgresConnector {
    connect_timeout: Duration,
}

impl Default for TokioPostgresConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl TokioPostgresConnector {
    fn pg_config(&self, config: &ConnectionConfig) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .password(config.password.expose_secret())
            .connect_timeout(self.connect_timeout)
            .ssl_mode(if config.tls_enabled {
                SslMode::Require
            } else {
                SslMode::Disable
            });
        pg
    }
}

#[async_trait]
impl PostgresConnector for TokioPostgresConnector {
    type Connection = PgConnection;

    async fn open(&self, config: &ConnectionConfig) -> Result<PgConnection, DriverError> {
        let pg = self.pg_config(config);

        if config.tls_enabled {
            let tls = native_tls::TlsConnector::new()
                .map_err(|e| DriverError::new(format!("TLS setup failed: {}", e)))?;
            let (client, connection) = pg
                .connect(postgres_native_tls::MakeTlsConnector::new(tls))
                .await?;
            spawn_driver(connection);
            Ok(PgConnection { client })
        } else {
            let (client, connection) = pg.connect(NoTls).await?;
            spawn_driver(connection);
            Ok(PgConnection { client })
        }
    }
}

fn spawn_driver<F>(connection: F)
where
    F: std::future::Future<Output = Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!(error = %e, "database connection closed with error");
        }
    });
}

/// Opens connections, retrying authentication races with backoff.
pub struct ConnectionEstablisher<C: PostgresConnector> {
    connector: C,
    retry: RetryExecutor,
}

impl<C: PostgresConnector> ConnectionEstablisher<C> {
    pub fn new(connector: C, retry: RetryExecutor) -> Self {
        Self { connector, retry }
    }

    /// Open a connection for `config`.
    pub async fn connect(
        &self,
        config: &ConnectionConfig,
        cancel: &CancellationToken,
    ) -> VaultDbResult<C::Connection> {
        self.retry
            .execute(OPERATION, cancel, move |_| self.connect_once(config))
            .await
    }

    async fn connect_once(&self, config: &ConnectionConfig) -> VaultDbResult<C::Connection> {
        match self.connector.open(config).await {
            Ok(connection) => {
                info!(
                    host = %config.host,
                    port = config.port,
                    database = %config.database,
                    user = %config.user,
                    "database connection established"
                );
                Ok(connection)
            }
            Err(DriverError { message }) => match classify_connect_error(&message) {
                ConnectFailureKind::AuthenticationRace => {
                    Err(ConnectionError::AuthenticationRace { message }.into())
                }
                ConnectFailureKind::Fatal => Err(ConnectionError::Failed { message }.into()),
            },
        }
    }
}

/// Mock session returned by [`MockPostgresConnector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConnection {
    /// Sequence number, unique per successful open.
    pub id: u32,
    pub user: String,
}

#[async_trait]
impl DatabaseSession for MockConnection {
    async fn ping(&self) -> Result<i32, DriverError> {
        Ok(1)
    }
}

/// Mock connector for testing.
///
/// Queued failures are returned first; once drained every open succeeds.
#[derive(Default)]
pub struct MockPostgresConnector {
    failures: Mutex<VecDeque<DriverError>>,
    default_failure: Mutex<Option<DriverError>>,
    attempts: AtomicU32,
    opened: AtomicU32,
    configs: Mutex<Vec<ConnectionConfig>>,
}

impl MockPostgresConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next open.
    pub fn queue_failure(&self, message: impl Into<String>) -> &Self {
        self.failures
            .lock()
            .unwrap()
            .push_back(DriverError::new(message));
        self
    }

    /// Fail every open once the queue is drained.
    pub fn fail_always(&self, message: impl Into<String>) -> &Self {
        *self.default_failure.lock().unwrap() = Some(DriverError::new(message));
        self
    }

    /// Number of open calls.
    pub fn attempt_count(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Configs passed to open, in order.
    pub fn configs(&self) -> Vec<ConnectionConfig> {
        self.configs.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostgresConnector for MockPostgresConnector {
    type Connection = MockConnection;

    async fn open(&self, config: &ConnectionConfig) -> Result<MockConnection, DriverError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().unwrap().push(config.clone());

        if let Some(failure) = self.failures.lock().unwrap().pop_front() {
            return Err(failure);
        }
        if let Some(failure) = self.default_failure.lock().unwrap().clone() {
            return Err(failure);
        }

        let id = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MockConnection {
            id,
            user: config.user.clone(),
        })
    }
}
