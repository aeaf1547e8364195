//! Business logic services.
//!
//! Services own the rules; route handlers only translate HTTP to service
//! calls and service errors to responses.

pub mod locks;
pub mod rewards;

pub use locks::KeyedLocks;
pub use rewards::{
    CheckInInput, LedgerSummary, PurchaseInput, PurchaseReceipt, RewardsError, RewardsService,
};
