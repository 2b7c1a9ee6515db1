//! Credential Types
//!
//! Token, dynamic credential and connection settings handed between the
//! bootstrap steps, plus the Vault wire envelopes they are decoded from.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::types::config::DatabaseConfig;

/// Vault client token. Opaque; never parsed or logged.
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::new(token.into()))
    }

    /// Raw token value, for the `X-Vault-Token` header only.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

/// Lease attached to a dynamic secret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaseInfo {
    pub lease_id: String,
    pub lease_duration: u64,
    pub renewable: bool,
}

/// Short-lived database username/password pair.
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    pub password: SecretString,
    pub lease: Option<LeaseInfo>,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
            lease: None,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("lease", &self.lease)
            .finish()
    }
}

/// Everything needed to open one database connection.
///
/// Built field by field; never rendered to or parsed from a DSN.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: SecretString,
    pub tls_enabled: bool,
}

impl ConnectionConfig {
    /// Combine deployment settings with a freshly fetched credential.
    pub fn from_parts(database: &DatabaseConfig, credential: &Credential) -> Self {
        Self {
            host: database.host.clone(),
            port: database.port,
            database: database.database.clone(),
            user: credential.username.clone(),
            password: credential.password.clone(),
            tls_enabled: database.tls_enabled,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("tls_enabled", &self.tls_enabled)
            .finish()
    }
}

/// AppRole login request body.
#[derive(Debug, Serialize)]
pub struct AppRoleLoginRequest<'a> {
    pub role_id: &'a str,
    pub secret_id: &'a str,
}

/// AppRole login response.
#[derive(Debug, Deserialize)]
pub struct AppRoleLoginResponse {
    pub auth: AppRoleAuth,
}

/// `auth` block of a login response.
#[derive(Debug, Deserialize)]
pub struct AppRoleAuth {
    pub client_token: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub policies: Vec<String>,
}

/// Dynamic database credential response.
#[derive(Debug, Deserialize)]
pub struct DatabaseCredsResponse {
    pub data: DatabaseCredsData,
    #[serde(default)]
    pub lease_id: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
}

/// `data` block of a credential response. Missing fields decode as empty and
/// are rejected by the fetcher.
#[derive(Debug, Deserialize)]
pub struct DatabaseCredsData {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}
