//! Dynamic Database Credentials
//!
//! Reads a freshly generated username/password from the database secrets
//! engine. A brand-new lease can race the engine's backend, so 5xx answers
//! and transport failures are retried; anything else is final.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::{HttpRequest, HttpTransport};
use crate::error::{CredentialError, ProtocolError, VaultDbResult};
use crate::resilience::RetryExecutor;
use crate::types::{AuthToken, Credential, DatabaseCredsResponse, LeaseInfo};

const OPERATION: &str = "database credential fetch";

/// Dynamic credential interface.
#[async_trait]
pub trait DynamicCredentialFetcher: Send + Sync {
    /// Fetch credentials for `role`, retrying transient failures.
    async fn fetch_credentials(
        &self,
        address: &str,
        token: &AuthToken,
        role: &str,
        cancel: &CancellationToken,
    ) -> VaultDbResult<Credential>;
}

/// Credential fetcher over an HTTP transport.
pub struct DynamicCredentialFetcherImpl<T: HttpTransport> {
    transport: Arc<T>,
    retry: RetryExecutor,
    mount: String,
}

impl<T: HttpTransport> DynamicCredentialFetcherImpl<T> {
    /// Fetcher for the default `database` mount.
    pub fn new(transport: Arc<T>, retry: RetryExecutor) -> Self {
        Self::with_mount(transport, retry, "database")
    }

    /// Fetcher for a custom mount path.
    pub fn with_mount(transport: Arc<T>, retry: RetryExecutor, mount: impl Into<String>) -> Self {
        Self {
            transport,
            retry,
            mount: mount.into(),
        }
    }

    fn creds_url(&self, address: &str, role: &str) -> String {
        format!(
            "{}/v1/{}/creds/{}",
            address.trim_end_matches('/'),
            self.mount,
            role
        )
    }

    async fn fetch_once(&self, url: &str, token: &AuthToken) -> VaultDbResult<Credential> {
        let request = HttpRequest::get(url).header("X-Vault-Token", token.expose());
        let response = self.transport.send(request).await?;

        if response.is_server_error() {
            return Err(CredentialError::ServerError {
                status: response.status,
                status_text: response.status_text,
                body: response.body,
            }
            .into());
        }

        if response.status != 200 {
            return Err(CredentialError::Rejected {
                status: response.status,
                status_text: response.status_text,
                body: response.body,
            }
            .into());
        }

        let creds: DatabaseCredsResponse =
            serde_json::from_str(&response.body).map_err(|e| ProtocolError::InvalidJson {
                message: e.to_string(),
            })?;

        if creds.data.username.is_empty() {
            return Err(CredentialError::EmptyCredential { field: "username" }.into());
        }
        if creds.data.password.is_empty() {
            return Err(CredentialError::EmptyCredential { field: "password" }.into());
        }

        let mut credential = Credential::new(creds.data.username, creds.data.password);
        if !creds.lease_id.is_empty() {
            credential.lease = Some(LeaseInfo {
                lease_id: creds.lease_id,
                lease_duration: creds.lease_duration,
                renewable: creds.renewable,
            });
        }
        Ok(credential)
    }
}

#[async_trait]
impl<T: HttpTransport> DynamicCredentialFetcher for DynamicCredentialFetcherImpl<T> {
    async fn fetch_credentials(
        &self,
        address: &str,
        token: &AuthToken,
        role: &str,
        cancel: &CancellationToken,
    ) -> VaultDbResult<Credential> {
        let url = self.creds_url(address, role);
        let url = url.as_str();

        let credential = self
            .retry
            .execute(OPERATION, cancel, move |_| self.fetch_once(url, token))
            .await?;

        info!(
            role,
            username = %credential.username,
            lease_duration = credential.lease.as_ref().map(|l| l.lease_duration),
            "fetched dynamic database credentials"
        );
        Ok(credential)
    }
}
