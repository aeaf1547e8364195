//! Reward ledger entries and purchase arithmetic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::merchant::RewardsTier;
use super::resolver::resolve_tier;
use crate::types::{CustomerId, LedgerEntryId, MAX_AMOUNT, MerchantId, PurchaseAmount, round2};

/// Errors from ledger arithmetic and entry construction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A seeded spend total is negative.
    #[error("initial total spent cannot be negative")]
    NegativeSeedSpend,
    /// A seeded purchase count is negative.
    #[error("initial purchase count cannot be negative")]
    NegativeSeedCount,
    /// The spend total would exceed [`MAX_AMOUNT`].
    #[error("total spent cannot exceed {}", MAX_AMOUNT)]
    SpendOverflow,
}

/// The discount currently applied to a customer at a merchant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentDiscount {
    /// Discount amount, in the merchant's discount unit.
    pub amount: Decimal,
}

/// Accumulated loyalty record for one customer at one merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardLedgerEntry {
    /// Entry ID.
    pub id: LedgerEntryId,
    /// Customer this entry belongs to.
    pub customer_id: CustomerId,
    /// Merchant this entry belongs to.
    pub merchant_id: MerchantId,
    /// Cumulative spend, rounded to cents.
    pub total_spent: Decimal,
    /// Number of recorded purchases.
    pub purchase_count: i64,
    /// Most recent check-in or visit.
    pub last_visit: DateTime<Utc>,
    /// Discount earned so far.
    pub current_discount: CurrentDiscount,
    /// Optimistic concurrency version, bumped on every update.
    pub version: i64,
    /// When the customer first checked in.
    pub created_at: DateTime<Utc>,
    /// When the entry was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Data needed to create a ledger entry on check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub customer_id: CustomerId,
    pub merchant_id: MerchantId,
    pub total_spent: Decimal,
    pub purchase_count: i64,
    pub last_visit: DateTime<Utc>,
}

impl NewLedgerEntry {
    /// A first check-in with no prior spend.
    #[must_use]
    pub fn check_in(
        customer_id: CustomerId,
        merchant_id: MerchantId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id,
            merchant_id,
            total_spent: Decimal::ZERO,
            purchase_count: 0,
            last_visit: now,
        }
    }

    /// Seed the entry with history imported from elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if either seed value is negative.
    pub fn with_seed(
        mut self,
        total_spent: Option<Decimal>,
        purchase_count: Option<i64>,
    ) -> Result<Self, LedgerError> {
        if let Some(spent) = total_spent {
            if spent.is_sign_negative() && !spent.is_zero() {
                return Err(LedgerError::NegativeSeedSpend);
            }
            let spent = round2(spent);
            if spent > MAX_AMOUNT {
                return Err(LedgerError::SpendOverflow);
            }
            self.total_spent = spent;
        }
        if let Some(count) = purchase_count {
            if count < 0 {
                return Err(LedgerError::NegativeSeedCount);
            }
            self.purchase_count = count;
        }
        Ok(self)
    }

    /// Materialize the entry with a fresh ID at version 0.
    #[must_use]
    pub fn into_entry(self, id: LedgerEntryId, now: DateTime<Utc>) -> RewardLedgerEntry {
        RewardLedgerEntry {
            id,
            customer_id: self.customer_id,
            merchant_id: self.merchant_id,
            total_spent: self.total_spent,
            purchase_count: self.purchase_count,
            last_visit: self.last_visit,
            current_discount: CurrentDiscount::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update to a ledger entry, applied atomically by storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerPatch {
    pub total_spent: Option<Decimal>,
    pub purchase_count: Option<i64>,
    pub discount_amount: Option<Decimal>,
    pub last_visit: Option<DateTime<Utc>>,
}

impl LedgerPatch {
    /// A patch that only touches `last_visit`.
    #[must_use]
    pub fn visit(at: DateTime<Utc>) -> Self {
        Self {
            last_visit: Some(at),
            ..Self::default()
        }
    }

    /// Apply the patch in place, bumping the version.
    pub fn apply_to(&self, entry: &mut RewardLedgerEntry, now: DateTime<Utc>) {
        if let Some(total_spent) = self.total_spent {
            entry.total_spent = total_spent;
        }
        if let Some(purchase_count) = self.purchase_count {
            entry.purchase_count = purchase_count;
        }
        if let Some(amount) = self.discount_amount {
            entry.current_discount.amount = amount;
        }
        if let Some(last_visit) = self.last_visit {
            entry.last_visit = last_visit;
        }
        entry.version += 1;
        entry.updated_at = now;
    }
}

/// Result of applying a purchase to a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOutcome {
    /// Fields to persist.
    pub patch: LedgerPatch,
    /// Highest tier reached by the new spend total.
    pub highest_tier: Option<RewardsTier>,
    /// Whether the customer's discount went up.
    pub upgraded: bool,
}

/// Compute the effect of a purchase on a ledger entry.
///
/// Spend is rounded to cents after adding. The discount is raised only when
/// the newly resolved tier offers strictly more than the current discount;
/// an equal or lower tier leaves it untouched.
///
/// # Errors
///
/// Returns [`LedgerError::SpendOverflow`] if the new total exceeds
/// [`MAX_AMOUNT`].
pub fn apply_purchase(
    entry: &RewardLedgerEntry,
    amount: PurchaseAmount,
    tiers: &[RewardsTier],
) -> Result<PurchaseOutcome, LedgerError> {
    let total_spent = entry
        .total_spent
        .checked_add(amount.value())
        .map(round2)
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or(LedgerError::SpendOverflow)?;
    let purchase_count = entry.purchase_count.saturating_add(1);

    let highest_tier = resolve_tier(total_spent, tiers).cloned();
    let upgraded = highest_tier
        .as_ref()
        .is_some_and(|tier| tier.discount > entry.current_discount.amount);

    let discount_amount = if upgraded {
        highest_tier.as_ref().map(|tier| tier.discount)
    } else {
        None
    };

    Ok(PurchaseOutcome {
        patch: LedgerPatch {
            total_spent: Some(total_spent),
            purchase_count: Some(purchase_count),
            discount_amount,
            last_visit: None,
        },
        highest_tier,
        upgraded,
    })
}
