//! Storage for ledger entries and merchant rewards configuration.
//!
//! # Database: `loyalty`
//!
//! ## Tables
//!
//! - `loyalty.merchant` - Merchants and their rewards configuration (JSONB)
//! - `loyalty.reward_ledger` - One row per (customer, merchant) pair
//!
//! # Backends
//!
//! Route handlers and services only see the [`LedgerStore`] and
//! [`MerchantStore`] traits. [`PgLedgerStore`] and [`PgMerchantStore`] are the
//! production implementations; [`InMemoryStore`] implements both for tests
//! and local development.
//!
//! # Concurrency
//!
//! [`LedgerStore::update_entry`] is a compare-and-swap on the entry's
//! `version`. A mismatch returns [`RepositoryError::StaleVersion`] without
//! writing anything, so callers can re-read and recompute.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p loyalty-cli -- migrate
//! ```

pub mod ledger;
pub mod memory;
pub mod merchants;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use loyalty_core::{
    CustomerId, LedgerEntryId, LedgerPatch, Merchant, MerchantId, NewLedgerEntry,
    RewardLedgerEntry, RewardsConfig,
};

pub use ledger::PgLedgerStore;
pub use memory::InMemoryStore;
pub use merchants::PgMerchantStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate ledger entry).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The row changed since it was read.
    #[error("stale version: expected {expected}")]
    StaleVersion {
        /// Version the caller read.
        expected: i64,
    },
}

/// Persistence for reward ledger entries.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Find the entry for a (customer, merchant) pair.
    async fn find_entry(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
    ) -> Result<Option<RewardLedgerEntry>, RepositoryError>;

    /// Insert a new entry at version 0.
    ///
    /// Returns `RepositoryError::Conflict` if the pair already has one.
    async fn create_entry(&self, entry: NewLedgerEntry)
    -> Result<RewardLedgerEntry, RepositoryError>;

    /// Apply a patch if the stored version still equals `expected_version`.
    ///
    /// All patched fields and the version bump are written together or not
    /// at all. Returns `RepositoryError::NotFound` if the entry is missing and
    /// `RepositoryError::StaleVersion` if it changed since it was read.
    async fn update_entry(
        &self,
        id: LedgerEntryId,
        expected_version: i64,
        patch: &LedgerPatch,
    ) -> Result<RewardLedgerEntry, RepositoryError>;

    /// All entries for a merchant, most recent visit first.
    async fn list_for_merchant(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<RewardLedgerEntry>, RepositoryError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Persistence for merchants and their rewards configuration.
#[async_trait]
pub trait MerchantStore: Send + Sync + 'static {
    /// Find a merchant by ID.
    async fn find_merchant(&self, id: &MerchantId) -> Result<Option<Merchant>, RepositoryError>;

    /// Create a merchant, or replace its name and rewards if it exists.
    async fn upsert_merchant(
        &self,
        id: &MerchantId,
        name: &str,
        rewards: &RewardsConfig,
    ) -> Result<Merchant, RepositoryError>;

    /// Replace an existing merchant's rewards configuration.
    ///
    /// Returns `RepositoryError::NotFound` if the merchant does not exist.
    async fn update_rewards(
        &self,
        id: &MerchantId,
        rewards: &RewardsConfig,
    ) -> Result<Merchant, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map unique and foreign key violations to repository errors.
fn map_constraint_error(err: sqlx::Error, conflict_message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(conflict_message.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Database(err)
}
