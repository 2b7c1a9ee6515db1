//! Vault Secrets
//!
//! - **AppRole**: role_id/secret_id login, never retried
//! - **Database credentials**: dynamic username/password with retry on 5xx and transport errors

pub mod approle;
pub mod database_creds;

pub use approle::{AppRoleAuthenticator, AppRoleAuthenticatorImpl};
pub use database_creds::{DynamicCredentialFetcher, DynamicCredentialFetcherImpl};
