//! AppRole Login
//!
//! Exchanges a role_id/secret_id pair for a Vault client token.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::{HttpRequest, HttpTransport};
use crate::error::{parse_error_response, AuthError, ProtocolError, VaultDbResult};
use crate::types::{AppRoleLoginRequest, AppRoleLoginResponse, AuthToken};

/// AppRole authentication interface.
#[async_trait]
pub trait AppRoleAuthenticator: Send + Sync {
    /// Log in and return a client token. Exactly one request; never retried.
    async fn login(&self, address: &str, role_id: &str, secret_id: &str)
        -> VaultDbResult<AuthToken>;
}

/// AppRole authenticator over an HTTP transport.
pub struct AppRoleAuthenticatorImpl<T: HttpTransport> {
    transport: Arc<T>,
    mount: String,
}

impl<T: HttpTransport> AppRoleAuthenticatorImpl<T> {
    /// Authenticator for the default `approle` mount.
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_mount(transport, "approle")
    }

    /// Authenticator for a custom mount path.
    pub fn with_mount(transport: Arc<T>, mount: impl Into<String>) -> Self {
        Self {
            transport,
            mount: mount.into(),
        }
    }

    fn login_url(&self, address: &str) -> String {
        format!(
            "{}/v1/auth/{}/login",
            address.trim_end_matches('/'),
            self.mount
        )
    }
}

#[async_trait]
impl<T: HttpTransport> AppRoleAuthenticator for AppRoleAuthenticatorImpl<T> {
    async fn login(
        &self,
        address: &str,
        role_id: &str,
        secret_id: &str,
    ) -> VaultDbResult<AuthToken> {
        let body = serde_json::to_string(&AppRoleLoginRequest { role_id, secret_id }).map_err(
            |e| ProtocolError::InvalidJson {
                message: e.to_string(),
            },
        )?;

        let url = self.login_url(address);
        debug!(url = %url, "AppRole login");

        let response = self.transport.send(HttpRequest::post_json(url, body)).await?;

        if response.status != 200 {
            let errors = parse_error_response(&response.body)
                .map(|r| r.errors)
                .unwrap_or_default();
            return Err(AuthError::LoginRejected {
                status: response.status,
                status_text: response.status_text,
                errors,
            }
            .into());
        }

        let login: AppRoleLoginResponse =
            serde_json::from_str(&response.body).map_err(|e| ProtocolError::InvalidJson {
                message: e.to_string(),
            })?;

        if login.auth.client_token.is_empty() {
            return Err(AuthError::MissingToken.into());
        }

        info!(
            lease_duration = login.auth.lease_duration,
            policies = ?login.auth.policies,
            "AppRole login succeeded"
        );

        Ok(AuthToken::new(login.auth.client_token))
    }
}
