//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::{LedgerStore, MerchantStore};
use crate::services::RewardsService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    rewards: RewardsService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration (cache TTL and retry limit)
    /// * `ledger` - Ledger entry storage
    /// * `merchants` - Merchant configuration storage
    #[must_use]
    pub fn new(
        config: &ServerConfig,
        ledger: Arc<dyn LedgerStore>,
        merchants: Arc<dyn MerchantStore>,
    ) -> Self {
        let rewards = RewardsService::new(
            ledger,
            merchants,
            config.merchant_cache_ttl,
            config.update_retries,
        );

        Self {
            inner: Arc::new(AppStateInner { rewards }),
        }
    }

    /// Get a reference to the rewards service.
    #[must_use]
    pub fn rewards(&self) -> &RewardsService {
        &self.inner.rewards
    }
}
