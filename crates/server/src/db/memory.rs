//! In-memory storage for tests and local development.
//!
//! Implements both [`LedgerStore`] and [`MerchantStore`] over process-local
//! maps. Each operation takes a single lock, so every write is atomic with
//! respect to readers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use loyalty_core::{
    CustomerId, LedgerEntryId, LedgerPatch, Merchant, MerchantId, NewLedgerEntry,
    RewardLedgerEntry, RewardsConfig,
};

use super::{LedgerStore, MerchantStore, RepositoryError};

/// Map-backed store.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<LedgerEntryId, RewardLedgerEntry>>,
    merchants: RwLock<HashMap<MerchantId, Merchant>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every ledger entry, in no particular order.
    pub async fn all_entries(&self) -> Vec<RewardLedgerEntry> {
        self.entries.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn find_entry(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
    ) -> Result<Option<RewardLedgerEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|e| &e.customer_id == customer_id && &e.merchant_id == merchant_id)
            .cloned())
    }

    async fn create_entry(
        &self,
        entry: NewLedgerEntry,
    ) -> Result<RewardLedgerEntry, RepositoryError> {
        // Mirror the foreign key on reward_ledger.merchant_id
        if !self.merchants.read().await.contains_key(&entry.merchant_id) {
            return Err(RepositoryError::NotFound);
        }

        let mut entries = self.entries.write().await;
        let exists = entries
            .values()
            .any(|e| e.customer_id == entry.customer_id && e.merchant_id == entry.merchant_id);
        if exists {
            return Err(RepositoryError::Conflict(
                "ledger entry already exists".to_owned(),
            ));
        }

        let created = entry.into_entry(LedgerEntryId::generate(), Utc::now());
        entries.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_entry(
        &self,
        id: LedgerEntryId,
        expected_version: i64,
        patch: &LedgerPatch,
    ) -> Result<RewardLedgerEntry, RepositoryError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if entry.version != expected_version {
            return Err(RepositoryError::StaleVersion {
                expected: expected_version,
            });
        }

        patch.apply_to(entry, Utc::now());
        Ok(entry.clone())
    }

    async fn list_for_merchant(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<RewardLedgerEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut matching: Vec<RewardLedgerEntry> = entries
            .values()
            .filter(|e| &e.merchant_id == merchant_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.last_visit
                .cmp(&a.last_visit)
                .then_with(|| a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        Ok(matching)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl MerchantStore for InMemoryStore {
    async fn find_merchant(&self, id: &MerchantId) -> Result<Option<Merchant>, RepositoryError> {
        Ok(self.merchants.read().await.get(id).cloned())
    }

    async fn upsert_merchant(
        &self,
        id: &MerchantId,
        name: &str,
        rewards: &RewardsConfig,
    ) -> Result<Merchant, RepositoryError> {
        let now = Utc::now();
        let mut merchants = self.merchants.write().await;
        let merchant = merchants
            .entry(id.clone())
            .and_modify(|m| {
                m.name = name.to_owned();
                m.rewards = rewards.clone();
                m.updated_at = now;
            })
            .or_insert_with(|| Merchant {
                id: id.clone(),
                name: name.to_owned(),
                rewards: rewards.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(merchant.clone())
    }

    async fn update_rewards(
        &self,
        id: &MerchantId,
        rewards: &RewardsConfig,
    ) -> Result<Merchant, RepositoryError> {
        let mut merchants = self.merchants.write().await;
        let merchant = merchants.get_mut(id).ok_or(RepositoryError::NotFound)?;
        merchant.rewards = rewards.clone();
        merchant.updated_at = Utc::now();
        Ok(merchant.clone())
    }
}
