//! Tiered loyalty rewards.
//!
//! A merchant configures a list of [`RewardsTier`]s. Each customer who checks
//! in at that merchant gets a [`RewardLedgerEntry`] that accumulates spend.
//! After every purchase the entry's spend is resolved against the tier list
//! and the customer's discount is raised if a better tier was reached.
//!
//! Discounts only ever move up through [`apply_purchase`]; a lower resolved
//! tier never reduces a discount that was already granted.

pub mod ledger;
pub mod merchant;
pub mod resolver;

pub use ledger::{
    CurrentDiscount, LedgerError, LedgerPatch, NewLedgerEntry, PurchaseOutcome,
    RewardLedgerEntry, apply_purchase,
};
pub use merchant::{Merchant, RewardsConfig, RewardsTier, TierError};
pub use resolver::{TierProgress, next_tier, resolve_tier, tier_progress};
