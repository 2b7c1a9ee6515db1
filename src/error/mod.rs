//! Vault Database Error Types
//!
//! One root error with kinded sub-enums. Every layer returns `VaultDbError`
//! and the orchestrator forwards it untouched, so callers can still tell a
//! rejected login apart from an exhausted connect loop.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the bootstrap sequence.
#[derive(Error, Debug)]
pub enum VaultDbError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("AppRole login failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Database credentials: {0}")]
    Credential(#[from] CredentialError),

    #[error("Database connect: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: Box<VaultDbError>,
    },

    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },

    #[error("Bootstrap did not finish within {deadline:?}")]
    DeadlineExceeded { deadline: Duration },
}

impl VaultDbError {
    /// Get error code for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "VAULTDB_CONFIG",
            Self::Auth(_) => "VAULTDB_AUTH",
            Self::Credential(_) => "VAULTDB_CREDENTIAL",
            Self::Connection(_) => "VAULTDB_CONNECT",
            Self::Network(_) => "VAULTDB_NETWORK",
            Self::Protocol(_) => "VAULTDB_PROTOCOL",
            Self::RetryExhausted { .. } => "VAULTDB_RETRY_EXHAUSTED",
            Self::Cancelled { .. } => "VAULTDB_CANCELLED",
            Self::DeadlineExceeded { .. } => "VAULTDB_DEADLINE",
        }
    }

    /// Check if error is a transient race worth another attempt.
    ///
    /// Transport failures and 5xx answers from the credential endpoint, plus
    /// connect failures that look like a not-yet-propagated role. Everything
    /// else is misconfiguration and will not heal by waiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Credential(CredentialError::ServerError { .. }) => true,
            Self::Connection(ConnectionError::AuthenticationRace { .. }) => true,
            _ => false,
        }
    }

    /// Underlying error once retry annotations are peeled off.
    pub fn root_cause(&self) -> &VaultDbError {
        match self {
            Self::RetryExhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Configuration error.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Missing required environment variable: {variable}")]
    MissingRequired { variable: String },

    #[error("Invalid value for {variable}: {message}")]
    InvalidValue { variable: String, message: String },
}

/// AppRole login error.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{status} {status_text}{}", format_vault_errors(.errors))]
    LoginRejected {
        status: u16,
        status_text: String,
        errors: Vec<String>,
    },

    #[error("login response carried no client token")]
    MissingToken,
}

/// Dynamic credential error.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("server error {status} {status_text}: {body}")]
    ServerError {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("request rejected {status} {status_text}: {body}")]
    Rejected {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("credential response has an empty {field}")]
    EmptyCredential { field: &'static str },
}

/// Database connect error, already classified.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("authentication not ready: {message}")]
    AuthenticationRace { message: String },

    #[error("{message}")]
    Failed { message: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("HTTP client could not be built: {message}")]
    ClientBuild { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ClientBuild { .. })
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Unexpected redirect to {location}")]
    UnexpectedRedirect { location: String },
}

/// Result type for vault database operations.
pub type VaultDbResult<T> = Result<T, VaultDbError>;

/// Error body returned by Vault on non-2xx answers.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct VaultErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<VaultErrorResponse> {
    serde_json::from_str(body).ok()
}

fn format_vault_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(": {}", errors.join("; "))
    }
}
