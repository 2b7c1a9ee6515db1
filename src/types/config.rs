//! Configuration Types
//!
//! Service configuration read from the process environment.

use secrecy::SecretString;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::resilience::BackoffPolicy;

/// Default HTTP listen port.
pub const DEFAULT_LISTEN_PORT: u16 = 8081;

/// Default dynamic-secret role.
pub const DEFAULT_DB_ROLE: &str = "app-role";

/// Default bound on one full bootstrap.
pub const DEFAULT_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(10);

/// Vault connection settings.
#[derive(Clone)]
pub struct VaultConfig {
    /// Vault address without trailing slash.
    pub address: String,
    /// AppRole role_id.
    pub role_id: SecretString,
    /// AppRole secret_id.
    pub secret_id: SecretString,
    /// Role under the database secrets engine.
    pub db_role: String,
    /// Mount path of the AppRole auth method.
    pub approle_mount: String,
    /// Mount path of the database secrets engine.
    pub db_mount: String,
}

impl VaultConfig {
    /// Config with default role and mount paths.
    pub fn new(
        address: impl Into<String>,
        role_id: impl Into<String>,
        secret_id: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into().trim_end_matches('/').to_string(),
            role_id: SecretString::new(role_id.into()),
            secret_id: SecretString::new(secret_id.into()),
            db_role: DEFAULT_DB_ROLE.to_string(),
            approle_mount: "approle".to_string(),
            db_mount: "database".to_string(),
        }
    }
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("address", &self.address)
            .field("role_id", &"[REDACTED]")
            .field("secret_id", &"[REDACTED]")
            .field("db_role", &self.db_role)
            .field("approle_mount", &self.approle_mount)
            .field("db_mount", &self.db_mount)
            .finish()
    }
}

/// Fixed database target. User and password come from Vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub tls_enabled: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            database: "shop".to_string(),
            tls_enabled: false,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub vault: VaultConfig,
    pub database: DatabaseConfig,
    pub backoff: BackoffPolicy,
    pub listen_port: u16,
    pub bootstrap_timeout: Duration,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// `VAULT_ADDR`, `VAULT_ROLE_ID` and `VAULT_SECRET_ID` are required.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a key/value map.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Load configuration through an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| ConfigurationError::MissingRequired {
                variable: key.to_string(),
            })
        };

        let address = require("VAULT_ADDR")?;
        let parsed = url::Url::parse(&address).map_err(|e| ConfigurationError::InvalidValue {
            variable: "VAULT_ADDR".to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidValue {
                variable: "VAULT_ADDR".to_string(),
                message: format!("unsupported scheme {:?}, expected http or https", parsed.scheme()),
            });
        }

        let mut vault = VaultConfig::new(
            address,
            require("VAULT_ROLE_ID")?,
            require("VAULT_SECRET_ID")?,
        );
        if let Some(role) = get("VAULT_DB_ROLE") {
            vault.db_role = role;
        }
        if let Some(mount) = get("VAULT_APPROLE_MOUNT") {
            vault.approle_mount = mount.trim_matches('/').to_string();
        }
        if let Some(mount) = get("VAULT_DB_MOUNT") {
            vault.db_mount = mount.trim_matches('/').to_string();
        }

        let defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            host: get("DB_HOST").unwrap_or(defaults.host),
            port: non_zero("DB_PORT", parse_or("DB_PORT", get("DB_PORT"), defaults.port)?)?,
            database: get("DB_NAME").unwrap_or(defaults.database),
            tls_enabled: parse_bool("DB_TLS", get("DB_TLS"), defaults.tls_enabled)?,
        };

        let listen_port = parse_or("PORT", get("PORT"), DEFAULT_LISTEN_PORT)?;
        let bootstrap_timeout = Duration::from_secs(non_zero(
            "BOOTSTRAP_TIMEOUT_SECS",
            parse_or(
                "BOOTSTRAP_TIMEOUT_SECS",
                get("BOOTSTRAP_TIMEOUT_SECS"),
                DEFAULT_BOOTSTRAP_TIMEOUT.as_secs(),
            )?,
        )?);

        Ok(Self {
            vault,
            database,
            backoff: BackoffPolicy::default(),
            listen_port,
            bootstrap_timeout,
        })
    }
}

fn parse_or<T>(variable: &str, value: Option<String>, default: T) -> Result<T, ConfigurationError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigurationError::InvalidValue {
                variable: variable.to_string(),
                message: e.to_string(),
            }),
    }
}

fn non_zero<T>(variable: &str, value: T) -> Result<T, ConfigurationError>
where
    T: Default + PartialEq,
{
    if value == T::default() {
        Err(ConfigurationError::InvalidValue {
            variable: variable.to_string(),
            message: "must be greater than zero".to_string(),
        })
    } else {
        Ok(value)
    }
}

fn parse_bool(
    variable: &str,
    value: Option<String>,
    default: bool,
) -> Result<bool, ConfigurationError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigurationError::InvalidValue {
                variable: variable.to_string(),
                message: format!("expected a boolean, got {:?}", v),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn required() -> HashMap<String, String> {
        [
            ("VAULT_ADDR", "http://127.0.0.1:8200/"),
            ("VAULT_ROLE_ID", "role-123"),
            ("VAULT_SECRET_ID", "secret-456"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_map(&required()).unwrap();

        assert_eq!(config.vault.address, "http://127.0.0.1:8200");
        assert_eq!(config.vault.role_id.expose_secret(), "role-123");
        assert_eq!(config.vault.secret_id.expose_secret(), "secret-456");
        assert_eq!(config.vault.db_role, "app-role");
        assert_eq!(config.vault.approle_mount, "approle");
        assert_eq!(config.vault.db_mount, "database");
        assert_eq!(config.database, DatabaseConfig::default());
        assert_eq!(config.listen_port, 8081);
        assert_eq!(config.bootstrap_timeout, Duration::from_secs(10));
        assert_eq!(config.backoff, BackoffPolicy::default());
    }

    #[test]
    fn test_each_required_variable() {
        for key in ["VAULT_ADDR", "VAULT_ROLE_ID", "VAULT_SECRET_ID"] {
            let mut vars = required();
            vars.remove(key);
            let err = ServiceConfig::from_map(&vars).unwrap_err();
            assert_eq!(
                err,
                ConfigurationError::MissingRequired {
                    variable: key.to_string()
                }
            );
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut vars = required();
        vars.insert("VAULT_SECRET_ID".to_string(), "  ".to_string());
        assert!(matches!(
            ServiceConfig::from_map(&vars),
            Err(ConfigurationError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let mut vars = required();
        for (k, v) in [
            ("PORT", "9090"),
            ("DB_HOST", "10.0.0.5"),
            ("DB_PORT", "55432"),
            ("DB_NAME", "orders"),
            ("DB_TLS", "true"),
            ("VAULT_DB_ROLE", "readonly"),
            ("VAULT_DB_MOUNT", "/pg/"),
            ("BOOTSTRAP_TIMEOUT_SECS", "3"),
        ] {
            vars.insert(k.to_string(), v.to_string());
        }

        let config = ServiceConfig::from_map(&vars).unwrap();
        assert_eq!(config.listen_port, 9090);
        assert_eq!(config.database.host, "10.0.0.5");
        assert_eq!(config.database.port, 55432);
        assert_eq!(config.database.database, "orders");
        assert!(config.database.tls_enabled);
        assert_eq!(config.vault.db_role, "readonly");
        assert_eq!(config.vault.db_mount, "pg");
        assert_eq!(config.bootstrap_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = required();
        vars.insert("PORT".to_string(), "eighty".to_string());
        assert!(matches!(
            ServiceConfig::from_map(&vars),
            Err(ConfigurationError::InvalidValue { variable, .. }) if variable == "PORT"
        ));

        let mut vars = required();
        vars.insert("DB_TLS".to_string(), "maybe".to_string());
        assert!(matches!(
            ServiceConfig::from_map(&vars),
            Err(ConfigurationError::InvalidValue { variable, .. }) if variable == "DB_TLS"
        ));

        for (key, value) in [
            ("VAULT_ADDR", "not a url"),
            ("VAULT_ADDR", "vault:8200"),
            ("VAULT_ADDR", "ftp://vault:8200"),
            ("DB_PORT", "0"),
            ("BOOTSTRAP_TIMEOUT_SECS", "0"),
        ] {
            let mut vars = required();
            vars.insert(key.to_string(), value.to_string());
            assert!(
                matches!(
                    ServiceConfig::from_map(&vars),
                    Err(ConfigurationError::InvalidValue { ref variable, .. }) if variable == key
                ),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_https_vault_address_accepted() {
        let mut vars = required();
        vars.insert("VAULT_ADDR".to_string(), "https://vault.example.com".to_string());
        let config = ServiceConfig::from_map(&vars).unwrap();
        assert_eq!(config.vault.address, "https://vault.example.com");
    }

    #[test]
    fn test_debug_redacts_approle_secrets() {
        let config = ServiceConfig::from_map(&required()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("role-123"));
        assert!(!rendered.contains("secret-456"));
    }
}
