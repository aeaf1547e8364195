//! Merchant rewards configuration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::MerchantId;

/// Maximum length of a tier name.
pub const MAX_TIER_NAME_LENGTH: usize = 64;

/// Errors that can occur when validating a rewards configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TierError {
    /// The tier name is empty.
    #[error("tier name cannot be empty")]
    EmptyName,
    /// The tier name is too long.
    #[error("tier name must be at most {max} characters")]
    NameTooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The milestone is below zero.
    #[error("tier {name:?} has a negative milestone")]
    NegativeMilestone {
        /// Offending tier.
        name: String,
    },
    /// The discount is below zero.
    #[error("tier {name:?} has a negative discount")]
    NegativeDiscount {
        /// Offending tier.
        name: String,
    },
    /// The welcome reward is below zero.
    #[error("welcome reward cannot be negative")]
    NegativeWelcomeReward,
}

/// A named spend threshold with an associated discount.
///
/// The discount unit (percent or currency) is up to the merchant and is
/// carried as metadata on [`RewardsConfig`]; tier resolution never looks at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsTier {
    /// Display label, e.g. "Gold".
    pub name: String,
    /// Minimum cumulative spend required to qualify.
    pub milestone: Decimal,
    /// Discount granted once the milestone is reached.
    pub discount: Decimal,
}

impl RewardsTier {
    /// Create a validated tier.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or too long, or if the milestone
    /// or discount is negative.
    pub fn new(
        name: impl Into<String>,
        milestone: Decimal,
        discount: Decimal,
    ) -> Result<Self, TierError> {
        let tier = Self {
            name: name.into().trim().to_owned(),
            milestone,
            discount,
        };
        tier.validate()?;
        Ok(tier)
    }

    /// Check this tier's invariants.
    ///
    /// # Errors
    ///
    /// See [`RewardsTier::new`].
    pub fn validate(&self) -> Result<(), TierError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(TierError::EmptyName);
        }
        if name.chars().count() > MAX_TIER_NAME_LENGTH {
            return Err(TierError::NameTooLong {
                max: MAX_TIER_NAME_LENGTH,
            });
        }
        if self.milestone.is_sign_negative() && !self.milestone.is_zero() {
            return Err(TierError::NegativeMilestone {
                name: name.to_owned(),
            });
        }
        if self.discount.is_sign_negative() && !self.discount.is_zero() {
            return Err(TierError::NegativeDiscount {
                name: name.to_owned(),
            });
        }
        Ok(())
    }
}

/// A merchant's rewards program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// Discount tiers. Storage order is not meaningful.
    #[serde(default)]
    pub tiers: Vec<RewardsTier>,
    /// Reward offered to first-time customers.
    #[serde(default)]
    pub welcome_reward: Option<Decimal>,
    /// How the merchant expresses discounts (e.g. "percent", "dollar").
    #[serde(default)]
    pub discount_type: Option<String>,
    /// How the merchant labels milestones (e.g. "spend").
    #[serde(default)]
    pub milestone_type: Option<String>,
}

impl RewardsConfig {
    /// Whether any tiers are configured.
    #[must_use]
    pub fn has_tiers(&self) -> bool {
        !self.tiers.is_empty()
    }

    /// Validate every tier and the welcome reward, normalizing tier names.
    ///
    /// # Errors
    ///
    /// Returns the first [`TierError`] encountered.
    pub fn validated(mut self) -> Result<Self, TierError> {
        for tier in &mut self.tiers {
            tier.validate()?;
            tier.name = tier.name.trim().to_owned();
        }
        if let Some(reward) = self.welcome_reward
            && reward.is_sign_negative()
            && !reward.is_zero()
        {
            return Err(TierError::NegativeWelcomeReward);
        }
        Ok(self)
    }
}

/// A merchant as seen by the rewards system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    /// Merchant ID.
    pub id: MerchantId,
    /// Business name.
    pub name: String,
    /// Rewards program configuration.
    #[serde(default)]
    pub rewards: RewardsConfig,
    /// When the merchant was onboarded.
    pub created_at: DateTime<Utc>,
    /// When the merchant was last updated.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_new_trims_name() {
        let tier = RewardsTier::new("  Gold ", Decimal::from(500), Decimal::from(15)).unwrap();
        assert_eq!(tier.name, "Gold");
    }

    #[test]
    fn test_new_rejects_bad_tiers() {
        assert_eq!(
            RewardsTier::new(" ", Decimal::ZERO, Decimal::ZERO),
            Err(TierError::EmptyName)
        );
        assert!(matches!(
            RewardsTier::new("Bronze", Decimal::from(-1), Decimal::ZERO),
            Err(TierError::NegativeMilestone { .. })
        ));
        assert!(matches!(
            RewardsTier::new("Bronze", Decimal::ZERO, Decimal::from(-5)),
            Err(TierError::NegativeDiscount { .. })
        ));
        assert!(matches!(
            RewardsTier::new("x".repeat(MAX_TIER_NAME_LENGTH + 1), Decimal::ZERO, Decimal::ZERO),
            Err(TierError::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_config_deserializes_numbers_and_strings() {
        let config: RewardsConfig = serde_json::from_str(
            r#"{
                "tiers": [
                    {"name": "Silver", "milestone": 100, "discount": "5"},
                    {"name": "Base", "milestone": "0", "discount": 0}
                ],
                "discount_type": "percent"
            }"#,
        )
        .unwrap();

        assert_eq!(config.tiers.len(), 2);
        assert_eq!(config.tiers[0].milestone, Decimal::from(100));
        assert_eq!(config.discount_type.as_deref(), Some("percent"));
        assert!(config.welcome_reward.is_none());
        assert!(config.has_tiers());
    }

    #[test]
    fn test_validated_rejects_negative_welcome_reward() {
        let config = RewardsConfig {
            welcome_reward: Some(Decimal::from(-2)),
            ..RewardsConfig::default()
        };
        assert_eq!(config.validated(), Err(TierError::NegativeWelcomeReward));
    }

    #[test]
    fn test_empty_config_has_no_tiers() {
        let config: RewardsConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.has_tiers());
        assert!(config.validated().is_ok());
    }
}
