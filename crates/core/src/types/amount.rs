//! Currency amounts using decimal arithmetic.
//!
//! Purchase amounts arrive from point-of-sale terminals and checkout flows as
//! strings. They are parsed once at the boundary into [`PurchaseAmount`] so
//! that business logic never sees an unvalidated number.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places kept for accumulated spend.
pub const CURRENCY_SCALE: u32 = 2;

/// Largest amount a spend total may hold: `999999999999999999.99`.
///
/// Matches the `NUMERIC(20, 2)` ledger column.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_661_992_959, 1_808_227_885, 5, false, 2);

/// Errors that can occur when parsing a [`PurchaseAmount`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The input string is empty.
    #[error("amount cannot be empty")]
    Empty,
    /// The input is not a finite decimal number.
    #[error("amount is not a valid number: {0:?}")]
    NotANumber(String),
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount does not fit in a spend total.
    #[error("amount cannot exceed {max}")]
    TooLarge {
        /// Largest accepted amount.
        max: Decimal,
    },
}

/// Round a currency value to two decimal places.
///
/// Midpoints round away from zero, so `0.125` becomes `0.13`.
#[must_use]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// A validated, non-negative purchase amount.
///
/// ## Examples
///
/// ```
/// use loyalty_core::PurchaseAmount;
///
/// assert!(PurchaseAmount::parse("30").is_ok());
/// assert!(PurchaseAmount::parse(" 12.50 ").is_ok());
///
/// assert!(PurchaseAmount::parse("abc").is_err());
/// assert!(PurchaseAmount::parse("NaN").is_err());
/// assert!(PurchaseAmount::parse("-5").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct PurchaseAmount(Decimal);

impl PurchaseAmount {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Parse an amount from caller-supplied text.
    ///
    /// Accepts plain decimals (`"30"`, `"12.50"`) and scientific notation
    /// (`"1.5e2"`). `Decimal` has no NaN or infinity, so anything that parses
    /// is finite.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a number, negative, or
    /// above [`MAX_AMOUNT`] once rounded to cents.
    pub fn parse(s: &str) -> Result<Self, AmountError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        // `Decimal::from_str` skips `_` separators
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            return Err(AmountError::NotANumber(trimmed.to_owned()));
        }

        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| AmountError::NotANumber(trimmed.to_owned()))?;

        Self::try_from(value)
    }

    /// Get the underlying decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for PurchaseAmount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative);
        }
        if round2(value) > MAX_AMOUNT {
            return Err(AmountError::TooLarge { max: MAX_AMOUNT });
        }
        Ok(Self(value))
    }
}

impl From<PurchaseAmount> for Decimal {
    fn from(amount: PurchaseAmount) -> Self {
        amount.0
    }
}

impl FromStr for PurchaseAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PurchaseAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
