//! Configuration management
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file. Unset variables fall back to the defaults below; set but
//! unparsable variables are an error rather than silently ignored.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::audit::{DEFAULT_AUDIT_QUERY_LIMIT, MAX_AUDIT_QUERY_LIMIT};

// ============================================================================
// Configuration Defaults
// ============================================================================

pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Seconds to wait for in-flight requests after a shutdown signal.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/qms";

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Audit query paging limits and request provenance policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    pub default_limit: i64,
    pub max_limit: i64,
    /// Take `source_address` from `X-Forwarded-For` instead of the TCP peer.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_AUDIT_QUERY_LIMIT,
            max_limit: MAX_AUDIT_QUERY_LIMIT,
            trust_forwarded_for: false,
        }
    }
}

/// Read `key`, falling back to `default` when it is unset
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load `.env` (if present), then read configuration from the environment
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read configuration from the environment only
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Config {
            server: ServerConfig {
                host: env_or("QMS_HOST", DEFAULT_SERVER_HOST.to_string())?,
                port: env_or("QMS_PORT", DEFAULT_SERVER_PORT)?,
                shutdown_timeout_secs: env_or(
                    "QMS_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                )?,
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL.to_string())?,
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                )?,
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                )?,
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                )?,
                idle_timeout_secs: env_or(
                    "DATABASE_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                )?,
            },
            audit: AuditConfig {
                default_limit: env_or("AUDIT_DEFAULT_LIMIT", DEFAULT_AUDIT_QUERY_LIMIT)?,
                max_limit: env_or("AUDIT_MAX_LIMIT", MAX_AUDIT_QUERY_LIMIT)?,
                trust_forwarded_for: env_or("AUDIT_TRUST_FORWARDED_FOR", false)?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.audit.default_limit <= 0 || self.audit.max_limit <= 0 {
            anyhow::bail!("Audit query limits must be greater than 0");
        }

        if self.audit.default_limit > self.audit.max_limit {
            anyhow::bail!(
                "Audit default_limit ({}) cannot be greater than max_limit ({})",
                self.audit.default_limit,
                self.audit.max_limit
            );
        }

        if self.audit.max_limit > MAX_AUDIT_QUERY_LIMIT {
            tracing::warn!(
                max_limit = self.audit.max_limit,
                cap = MAX_AUDIT_QUERY_LIMIT,
                "Audit max_limit exceeds the hard cap and will be clamped"
            );
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            audit: AuditConfig::default(),
        }
    }
}
