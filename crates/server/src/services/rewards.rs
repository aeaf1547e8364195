//! Rewards service: check-ins, purchases, visits, and merchant configuration.
//!
//! # Purchase updates
//!
//! [`RewardsService::record_purchase`] is the only path that changes spend or
//! discount. For one (customer, merchant) pair it runs under a per-key lock,
//! and its write is a compare-and-swap on the entry version, so two server
//! processes sharing a database cannot lose an update either. A stale
//! version re-reads the entry and recomputes from fresh state.
//!
//! Every precondition is checked before anything is written.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use moka::ops::compute::Op;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use loyalty_core::{
    CustomerId, LedgerPatch, Merchant, MerchantId, NewLedgerEntry, PurchaseAmount,
    RewardLedgerEntry, RewardsConfig, TierProgress, apply_purchase, tier_progress,
};

use super::locks::KeyedLocks;
use crate::db::{LedgerStore, MerchantStore, RepositoryError};

/// Errors reported by the rewards service.
#[derive(Debug, Error)]
pub enum RewardsError {
    /// Caller input could not be parsed or validated.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required record does not exist.
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// The merchant is not configured for this operation.
    #[error("precondition failed: {0}")]
    PreconditionFailed(&'static str),

    /// The operation collides with existing or concurrently changed state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

// =============================================================================
// Inputs
// =============================================================================

fn invalid(err: impl ToString) -> RewardsError {
    RewardsError::InvalidInput(err.to_string())
}

/// A validated purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseInput {
    pub customer_id: CustomerId,
    pub merchant_id: MerchantId,
    pub amount: PurchaseAmount,
}

impl PurchaseInput {
    /// Validate raw purchase fields.
    ///
    /// # Errors
    ///
    /// Returns `RewardsError::InvalidInput` if an ID is blank or the amount
    /// is not a non-negative number.
    pub fn parse(
        customer_id: &str,
        merchant_id: &str,
        purchase_amount: &str,
    ) -> Result<Self, RewardsError> {
        Ok(Self {
            customer_id: CustomerId::parse(customer_id).map_err(invalid)?,
            merchant_id: MerchantId::parse(merchant_id).map_err(invalid)?,
            amount: PurchaseAmount::parse(purchase_amount).map_err(invalid)?,
        })
    }
}

/// A validated check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInInput {
    pub customer_id: CustomerId,
    pub merchant_id: MerchantId,
    pub total_spent: Option<Decimal>,
    pub purchase_count: Option<i64>,
}

impl CheckInInput {
    /// Validate raw check-in fields.
    ///
    /// # Errors
    ///
    /// Returns `RewardsError::InvalidInput` if an ID is blank or the seeded
    /// spend is not a number.
    pub fn parse(
        customer_id: &str,
        merchant_id: &str,
        total_spent: Option<&str>,
        purchase_count: Option<i64>,
    ) -> Result<Self, RewardsError> {
        let total_spent = total_spent
            .map(PurchaseAmount::parse)
            .transpose()
            .map_err(invalid)?
            .map(|amount| amount.value());

        Ok(Self {
            customer_id: CustomerId::parse(customer_id).map_err(invalid)?,
            merchant_id: MerchantId::parse(merchant_id).map_err(invalid)?,
            total_spent,
            purchase_count,
        })
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// Result of a purchase update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    /// The entry after the update.
    pub updated_entry: RewardLedgerEntry,
    /// Whether the customer's discount went up.
    pub customer_upgraded: bool,
}

/// A ledger entry with the customer's position in the tier ladder.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub entry: RewardLedgerEntry,
    pub progress: TierProgress,
}

// =============================================================================
// Service
// =============================================================================

/// Rewards operations over injected storage.
pub struct RewardsService {
    ledger: Arc<dyn LedgerStore>,
    merchants: Arc<dyn MerchantStore>,
    merchant_cache: Cache<MerchantId, Arc<Merchant>>,
    locks: KeyedLocks<(CustomerId, MerchantId)>,
    max_retries: u32,
}

impl RewardsService {
    /// Create a new rewards service.
    ///
    /// # Arguments
    ///
    /// * `ledger` - Ledger entry storage
    /// * `merchants` - Merchant configuration storage
    /// * `merchant_cache_ttl` - How long a merchant lookup is reused
    /// * `max_retries` - Retries after a concurrent update on the same entry
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        merchants: Arc<dyn MerchantStore>,
        merchant_cache_ttl: Duration,
        max_retries: u32,
    ) -> Self {
        let merchant_cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(merchant_cache_ttl)
            .build();

        Self {
            ledger,
            merchants,
            merchant_cache,
            locks: KeyedLocks::new(),
            max_retries,
        }
    }

    /// Look up a merchant, going through the cache.
    async fn merchant(&self, id: &MerchantId) -> Result<Option<Arc<Merchant>>, RewardsError> {
        if let Some(cached) = self.merchant_cache.get(id).await {
            return Ok(Some(cached));
        }

        let Some(merchant) = self.merchants.find_merchant(id).await? else {
            return Ok(None);
        };
        let merchant = Arc::new(merchant);
        self.cache_merchant(Arc::clone(&merchant)).await;
        Ok(Some(merchant))
    }

    /// Cache a merchant unless a newer copy is already cached.
    ///
    /// A lookup that read the row before a rewards update may finish after
    /// the update cached its result; comparing `updated_at` keeps the newer.
    async fn cache_merchant(&self, merchant: Arc<Merchant>) {
        let _ = self
            .merchant_cache
            .entry(merchant.id.clone())
            .and_compute_with(|cached| {
                let op = match cached {
                    Some(entry) if entry.value().updated_at >= merchant.updated_at => Op::Nop,
                    _ => Op::Put(Arc::clone(&merchant)),
                };
                std::future::ready(op)
            })
            .await;
    }

    async fn require_merchant(&self, id: &MerchantId) -> Result<Arc<Merchant>, RewardsError> {
        self.merchant(id)
            .await?
            .ok_or(RewardsError::NotFound("merchant"))
    }

    async fn require_entry(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
    ) -> Result<RewardLedgerEntry, RewardsError> {
        self.ledger
            .find_entry(customer_id, merchant_id)
            .await?
            .ok_or(RewardsError::NotFound("ledger entry"))
    }

    /// Create the ledger entry for a customer's first check-in at a merchant.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if a seed value is negative
    /// - `NotFound("merchant")` if the merchant does not exist
    /// - `Conflict` if the customer already has an entry at this merchant
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id, merchant_id = %input.merchant_id))]
    pub async fn check_in(&self, input: CheckInInput) -> Result<RewardLedgerEntry, RewardsError> {
        let new_entry =
            NewLedgerEntry::check_in(input.customer_id, input.merchant_id, Utc::now())
                .with_seed(input.total_spent, input.purchase_count)
                .map_err(invalid)?;

        self.require_merchant(&new_entry.merchant_id).await?;

        let entry = self
            .ledger
            .create_entry(new_entry)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    RewardsError::Conflict("ledger entry already exists".to_owned())
                }
                RepositoryError::NotFound => RewardsError::NotFound("merchant"),
                other => RewardsError::Storage(other),
            })?;

        info!(entry_id = %entry.id, "Customer checked in");
        Ok(entry)
    }

    /// Apply a purchase to a customer's ledger entry.
    ///
    /// # Errors
    ///
    /// - `NotFound("ledger entry")` if the customer never checked in here
    /// - `NotFound("merchant")` if the merchant does not exist
    /// - `PreconditionFailed` if the merchant has no tiers; the purchase is
    ///   not recorded
    /// - `Conflict` if concurrent writers kept winning past the retry limit
    #[instrument(
        skip(self, input),
        fields(customer_id = %input.customer_id, merchant_id = %input.merchant_id, amount = %input.amount)
    )]
    pub async fn record_purchase(
        &self,
        input: PurchaseInput,
    ) -> Result<PurchaseReceipt, RewardsError> {
        let _guard = self
            .locks
            .lock((input.customer_id.clone(), input.merchant_id.clone()))
            .await;

        let mut attempt = 0;
        loop {
            let entry = self
                .require_entry(&input.customer_id, &input.merchant_id)
                .await?;
            let merchant = self.require_merchant(&input.merchant_id).await?;
            if !merchant.rewards.has_tiers() {
                return Err(RewardsError::PreconditionFailed("no tiers configured"));
            }

            let outcome =
                apply_purchase(&entry, input.amount, &merchant.rewards.tiers).map_err(invalid)?;

            match self
                .ledger
                .update_entry(entry.id, entry.version, &outcome.patch)
                .await
            {
                Ok(updated) => {
                    if outcome.upgraded {
                        info!(
                            entry_id = %updated.id,
                            tier = outcome.highest_tier.as_ref().map_or("", |t| t.name.as_str()),
                            discount = %updated.current_discount.amount,
                            "Customer upgraded"
                        );
                    }
                    return Ok(PurchaseReceipt {
                        updated_entry: updated,
                        customer_upgraded: outcome.upgraded,
                    });
                }
                Err(RepositoryError::StaleVersion { expected }) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(entry_id = %entry.id, expected, attempt, "Ledger entry changed concurrently, retrying");
                }
                Err(RepositoryError::StaleVersion { .. }) => {
                    return Err(RewardsError::Conflict(
                        "ledger entry was updated concurrently, retry the purchase".to_owned(),
                    ));
                }
                Err(RepositoryError::NotFound) => {
                    return Err(RewardsError::NotFound("ledger entry"));
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Touch the last-visit time on an existing ledger entry.
    ///
    /// # Errors
    ///
    /// - `NotFound("ledger entry")` if the customer never checked in here
    /// - `Conflict` if concurrent writers kept winning past the retry limit
    #[instrument(skip_all, fields(customer_id = %customer_id, merchant_id = %merchant_id))]
    pub async fn record_visit(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
    ) -> Result<RewardLedgerEntry, RewardsError> {
        let _guard = self
            .locks
            .lock((customer_id.clone(), merchant_id.clone()))
            .await;

        let mut attempt = 0;
        loop {
            let entry = self.require_entry(customer_id, merchant_id).await?;
            let patch = LedgerPatch::visit(Utc::now());

            match self
                .ledger
                .update_entry(entry.id, entry.version, &patch)
                .await
            {
                Ok(updated) => return Ok(updated),
                Err(RepositoryError::StaleVersion { expected }) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(entry_id = %entry.id, expected, attempt, "Ledger entry changed concurrently, retrying");
                }
                Err(RepositoryError::StaleVersion { .. }) => {
                    return Err(RewardsError::Conflict(
                        "ledger entry was updated concurrently, retry the visit".to_owned(),
                    ));
                }
                Err(RepositoryError::NotFound) => {
                    return Err(RewardsError::NotFound("ledger entry"));
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Look up a customer's entry and tier progress at a merchant.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entry or the merchant does not exist.
    pub async fn summary(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
    ) -> Result<LedgerSummary, RewardsError> {
        let entry = self.require_entry(customer_id, merchant_id).await?;
        let merchant = self.require_merchant(merchant_id).await?;
        let progress = tier_progress(entry.total_spent, &merchant.rewards.tiers);
        Ok(LedgerSummary { entry, progress })
    }

    /// All customers of a merchant, most recent visit first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound("merchant")` if the merchant does not exist.
    pub async fn customers(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<RewardLedgerEntry>, RewardsError> {
        self.require_merchant(merchant_id).await?;
        Ok(self.ledger.list_for_merchant(merchant_id).await?)
    }

    /// A merchant's rewards configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotFound("merchant")` if the merchant does not exist.
    pub async fn merchant_rewards(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<RewardsConfig, RewardsError> {
        Ok(self.require_merchant(merchant_id).await?.rewards.clone())
    }

    /// Replace a merchant's rewards configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if a tier or the welcome reward is invalid
    /// - `NotFound("merchant")` if the merchant does not exist
    #[instrument(skip_all, fields(merchant_id = %merchant_id, tiers = rewards.tiers.len()))]
    pub async fn update_merchant_rewards(
        &self,
        merchant_id: &MerchantId,
        rewards: RewardsConfig,
    ) -> Result<Merchant, RewardsError> {
        let rewards = rewards.validated().map_err(invalid)?;

        let merchant = self
            .merchants
            .update_rewards(merchant_id, &rewards)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => RewardsError::NotFound("merchant"),
                other => RewardsError::Storage(other),
            })?;
        self.cache_merchant(Arc::new(merchant.clone())).await;

        info!("Merchant rewards updated");
        Ok(merchant)
    }

    /// Check that storage is reachable.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the ledger backend does not respond.
    pub async fn ping(&self) -> Result<(), RewardsError> {
        Ok(self.ledger.ping().await?)
    }
}
