//! Vault Database Types
//!
//! Configuration, credential and wire types.

pub mod config;
pub mod credential;

pub use config::{
    DatabaseConfig, ServiceConfig, VaultConfig, DEFAULT_BOOTSTRAP_TIMEOUT, DEFAULT_DB_ROLE,
    DEFAULT_LISTEN_PORT,
};
pub use credential::{
    AppRoleAuth, AppRoleLoginRequest, AppRoleLoginResponse, AuthToken, ConnectionConfig,
    Credential, DatabaseCredsData, DatabaseCredsResponse, LeaseInfo,
};
