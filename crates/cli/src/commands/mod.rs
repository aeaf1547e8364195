//! CLI command implementations.

pub mod merchant;
pub mod migrate;
pub mod tiers;

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Storage rejected the operation.
    #[error("Storage error: {0}")]
    Repository(#[from] loyalty_server::db::RepositoryError),

    /// Input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input file is not valid merchant YAML.
    #[error("Invalid merchant file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Input value failed validation.
    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// Read the database URL, preferring `LOYALTY_DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("LOYALTY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("LOYALTY_DATABASE_URL"))
}

fn read_file(path: &Path) -> Result<String, CommandError> {
    std::fs::read_to_string(path).map_err(|source| CommandError::Io {
        path: path.to_owned(),
        source,
    })
}
