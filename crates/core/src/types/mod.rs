//! Core types for Loyalty POS.
//!
//! This module provides type-safe wrappers for identifiers and money.

pub mod amount;
pub mod id;

pub use amount::{AmountError, CURRENCY_SCALE, MAX_AMOUNT, PurchaseAmount, round2};
pub use id::{CustomerId, IdError, LedgerEntryId, MerchantId};
