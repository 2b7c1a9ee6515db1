//! Vault Database Integration Module
//!
//! Logs in to Vault with AppRole, reads a dynamic Postgres credential and opens
//! a connection with it, riding out the propagation races that freshly issued
//! roles and credentials go through.
//!
//! # Features
//!
//! - AppRole login (never retried: a bad role/secret does not heal)
//! - Dynamic database credentials with retry on 5xx and transport failures
//! - Postgres connect with retry on authentication-race symptoms only
//! - Exponential backoff (100ms, 200ms, 400ms, 800ms) over at most 5 attempts
//! - Cancellation token honored by every retry loop and network call
//!
//! # Example
//!
//! ```rust,ignore
//! use integrations_vault_database::{Bootstrap, DatabaseSession, ServiceConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::from_env()?;
//!     let bootstrap = Bootstrap::from_config(&config)?;
//!
//!     let connection = bootstrap
//!         .establish_connection(&CancellationToken::new())
//!         .await?;
//!     println!("select 1 = {}", connection.ping().await?);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, credential and wire types
//! - `error`: error hierarchy and the retry predicate
//! - `core`: HTTP transport
//! - `resilience`: backoff policy and retry executor
//! - `secrets`: AppRole login and dynamic credential fetch
//! - `database`: connect-failure classification and connection establishment
//! - `bootstrap`: the login → credentials → connect sequence
//! - `server`: `/healthz` and `/db/ping`
//! - `telemetry`: logging setup

pub mod bootstrap;
pub mod core;
pub mod database;
pub mod error;
pub mod resilience;
pub mod secrets;
pub mod server;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod fixtures;

// Re-export orchestrator
pub use bootstrap::Bootstrap;

// Re-export errors
pub use error::{
    parse_error_response, AuthError, ConfigurationError, ConnectionError, CredentialError,
    NetworkError, ProtocolError, VaultDbError, VaultDbResult, VaultErrorResponse,
};

// Re-export types
pub use types::{
    AuthToken, ConnectionConfig, Credential, DatabaseConfig, LeaseInfo, ServiceConfig,
    VaultConfig,
};

// Re-export core components
pub use core::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

// Re-export resilience
pub use resilience::{BackoffPolicy, RetryExecutor};

// Re-export secrets
pub use secrets::{
    AppRoleAuthenticator, AppRoleAuthenticatorImpl, DynamicCredentialFetcher,
    DynamicCredentialFetcherImpl,
};

// Re-export database
pub use database::{
    classify_connect_error, ConnectFailureKind, ConnectionEstablisher, DatabaseSession,
    DriverError, MockConnection, MockPostgresConnector, PgConnection, PostgresConnector,
    TokioPostgresConnector, AUTH_RACE_MARKERS,
};

// Re-export server
pub use server::{router, AppState};

// Re-export telemetry
pub use telemetry::{LogFormat, LogLevel, LoggingConfig};
