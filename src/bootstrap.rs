//! Bootstrap
//!
//! AppRole login, then dynamic credentials, then a database connection.
//! Each call runs the full sequence with its own token and credential;
//! nothing is cached between calls.

use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::core::{HttpTransport, ReqwestHttpTransport};
use crate::database::{ConnectionEstablisher, PostgresConnector, TokioPostgresConnector};
use crate::error::{VaultDbError, VaultDbResult};
use crate::resilience::{BackoffPolicy, RetryExecutor};
use crate::secrets::{
    AppRoleAuthenticator, AppRoleAuthenticatorImpl, DynamicCredentialFetcher,
    DynamicCredentialFetcherImpl,
};
use crate::types::{ConnectionConfig, DatabaseConfig, ServiceConfig, VaultConfig};

/// Composes login, credential fetch and connect.
pub struct Bootstrap<T: HttpTransport, C: PostgresConnector> {
    vault: VaultConfig,
    database: DatabaseConfig,
    authenticator: AppRoleAuthenticatorImpl<T>,
    fetcher: DynamicCredentialFetcherImpl<T>,
    establisher: ConnectionEstablisher<C>,
}

impl Bootstrap<ReqwestHttpTransport, TokioPostgresConnector> {
    /// Production bootstrap: reqwest against Vault, tokio-postgres against the database.
    pub fn from_config(config: &ServiceConfig) -> VaultDbResult<Self> {
        let transport = Arc::new(ReqwestHttpTransport::new()?);
        Ok(Self::new(
            config.vault.clone(),
            config.database.clone(),
            config.backoff,
            transport,
            TokioPostgresConnector::default(),
        ))
    }
}

impl<T: HttpTransport, C: PostgresConnector> Bootstrap<T, C> {
    /// Create a bootstrap with custom components.
    pub fn new(
        vault: VaultConfig,
        database: DatabaseConfig,
        backoff: BackoffPolicy,
        transport: Arc<T>,
        connector: C,
    ) -> Self {
        let retry = RetryExecutor::new(backoff);
        Self {
            authenticator: AppRoleAuthenticatorImpl::with_mount(
                transport.clone(),
                vault.approle_mount.clone(),
            ),
            fetcher: DynamicCredentialFetcherImpl::with_mount(
                transport,
                retry,
                vault.db_mount.clone(),
            ),
            establisher: ConnectionEstablisher::new(connector, retry),
            vault,
            database,
        }
    }

    /// Run login, credential fetch and connect in order.
    ///
    /// The first failure is returned unchanged. `cancel` is honored during
    /// every network call and between retry attempts.
    #[instrument(
        skip_all,
        fields(vault = %self.vault.address, role = %self.vault.db_role)
    )]
    pub async fn establish_connection(
        &self,
        cancel: &CancellationToken,
    ) -> VaultDbResult<C::Connection> {
        if cancel.is_cancelled() {
            return Err(VaultDbError::Cancelled {
                operation: "AppRole login",
            });
        }

        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(VaultDbError::Cancelled { operation: "AppRole login" });
            }
            token = self.authenticator.login(
                &self.vault.address,
                self.vault.role_id.expose_secret(),
                self.vault.secret_id.expose_secret(),
            ) => token?,
        };

        let credential = self
            .fetcher
            .fetch_credentials(&self.vault.address, &token, &self.vault.db_role, cancel)
            .await?;

        let config = ConnectionConfig::from_parts(&self.database, &credential);
        self.establisher.connect(&config, cancel).await
    }

    /// [`establish_connection`](Self::establish_connection) bounded by `deadline`.
    pub async fn establish_connection_with_deadline(
        &self,
        cancel: &CancellationToken,
        deadline: Duration,
    ) -> VaultDbResult<C::Connection> {
        match tokio::time::timeout(deadline, self.establish_connection(cancel)).await {
            Ok(result) => result,
            Err(_) => Err(VaultDbError::DeadlineExceeded { deadline }),
        }
    }
}
