//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LOYALTY_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`). Only required when `LOYALTY_STORAGE=postgres`.
//!
//! ## Optional
//! - `LOYALTY_STORAGE` - `postgres` (default) or `memory`
//! - `LOYALTY_HOST` - Bind address (default: 127.0.0.1)
//! - `LOYALTY_PORT` - Listen port (default: 3000)
//! - `LOYALTY_MERCHANT_CACHE_TTL_SECS` - Merchant config cache TTL (default: 300)
//! - `LOYALTY_UPDATE_RETRIES` - Retries after a concurrent ledger update (default: 3)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which storage backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// `PostgreSQL` via sqlx.
    #[default]
    Postgres,
    /// Process-local maps. Data is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

/// Loyalty server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Storage backend
    pub storage: StorageBackend,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// How long merchant rewards configuration is cached
    pub merchant_cache_ttl: Duration,
    /// Retries after an optimistic concurrency conflict on a ledger entry
    pub update_retries: u32,
    /// Error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; Sentry is disabled when unset
    pub dsn: Option<String>,
    /// Environment tag (e.g., "production")
    pub environment: Option<String>,
    /// Fraction of error events to send
    pub sample_rate: f32,
    /// Fraction of transactions to trace
    pub traces_sample_rate: f32,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let storage = env.parsed_or("LOYALTY_STORAGE", StorageBackend::default())?;
        let database_url = env.database_url("LOYALTY_DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "LOYALTY_DATABASE_URL".to_string(),
            ));
        }

        let host = env.parsed_or("LOYALTY_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = env.parsed_or("LOYALTY_PORT", 3000_u16)?;
        let merchant_cache_ttl =
            Duration::from_secs(env.parsed_or("LOYALTY_MERCHANT_CACHE_TTL_SECS", 300_u64)?);
        let update_retries = env.parsed_or("LOYALTY_UPDATE_RETRIES", 3_u32)?;

        let sentry = SentryConfig {
            dsn: env.optional("SENTRY_DSN"),
            environment: env.optional("SENTRY_ENVIRONMENT"),
            sample_rate: env.parsed_or("SENTRY_SAMPLE_RATE", 1.0_f32)?,
            traces_sample_rate: env.parsed_or("SENTRY_TRACES_SAMPLE_RATE", 0.0_f32)?,
        };

        Ok(Self {
            storage,
            database_url,
            host,
            port,
            merchant_cache_ttl,
            update_retries,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Configuration for an in-memory server, used by tests and local demos.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            merchant_cache_ttl: Duration::from_secs(300),
            update_retries: 3,
            sentry: SentryConfig::default(),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional, non-blank variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Parse a variable, using `default` when it is unset.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
    }
}
