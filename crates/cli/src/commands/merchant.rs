//! Merchant management commands.
//!
//! # Usage
//!
//! ```bash
//! loyalty merchant seed --file merchant.yaml
//! ```
//!
//! # File Format
//!
//! ```yaml
//! id: corner-cafe
//! name: Corner Cafe
//! rewards:
//!   discount_type: percent
//!   tiers:
//!     - { name: Base, milestone: 0, discount: 0 }
//!     - { name: Silver, milestone: 100, discount: 5 }
//!     - { name: Gold, milestone: 500, discount: 15 }
//! ```

use std::path::Path;

use serde::Deserialize;

use loyalty_core::{MerchantId, RewardsConfig};
use loyalty_server::db::{self, MerchantStore, PgMerchantStore};

use super::{CommandError, database_url, read_file};

/// A merchant definition read from YAML.
#[derive(Debug, Deserialize)]
pub struct MerchantFile {
    pub id: MerchantId,
    pub name: String,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

impl MerchantFile {
    /// Parse and validate a merchant definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a tier is invalid.
    pub fn parse(yaml: &str) -> Result<Self, CommandError> {
        let file: Self = serde_yaml::from_str(yaml)?;
        let name = file.name.trim().to_owned();
        if name.is_empty() {
            return Err(CommandError::Invalid("merchant name is empty".to_owned()));
        }
        let rewards = file
            .rewards
            .validated()
            .map_err(|e| CommandError::Invalid(e.to_string()))?;

        Ok(Self {
            id: file.id,
            name,
            rewards,
        })
    }

    /// Read and validate a merchant definition from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, CommandError> {
        Self::parse(&read_file(path)?)
    }
}

/// Create or update a merchant from a YAML file.
///
/// # Errors
///
/// Returns an error if the file is invalid or the database write fails.
pub async fn seed(path: &Path) -> Result<(), CommandError> {
    let file = MerchantFile::load(path)?;
    let database_url = database_url()?;

    tracing::info!("Connecting to loyalty database...");
    let pool = db::create_pool(&database_url).await?;
    let store = PgMerchantStore::new(pool);

    let merchant = store
        .upsert_merchant(&file.id, &file.name, &file.rewards)
        .await?;

    tracing::info!(
        "Merchant seeded! ID: {}, Name: {}, Tiers: {}",
        merchant.id,
        merchant.name,
        merchant.rewards.tiers.len()
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_parse_merchant_file() {
        let file = MerchantFile::parse(
            r"
id: corner-cafe
name: '  Corner Cafe '
rewards:
  discount_type: percent
  tiers:
    - { name: Gold, milestone: 500, discount: 15 }
    - { name: ' Base ', milestone: 0, discount: 0 }
",
        )
        .unwrap();

        assert_eq!(file.id.as_str(), "corner-cafe");
        assert_eq!(file.name, "Corner Cafe");
        assert_eq!(file.rewards.tiers.len(), 2);
        assert_eq!(file.rewards.tiers[0].discount, Decimal::from(15));
        assert_eq!(file.rewards.tiers[1].name, "Base");
        assert_eq!(file.rewards.discount_type.as_deref(), Some("percent"));
    }

    #[test]
    fn test_rewards_default_to_empty() {
        let file = MerchantFile::parse("id: cafe\nname: Cafe\n").unwrap();
        assert!(!file.rewards.has_tiers());
    }

    #[test]
    fn test_invalid_merchant_files() {
        let negative = "id: cafe\nname: Cafe\nrewards:\n  tiers:\n    - { name: Bad, milestone: -1, discount: 0 }\n";
        assert!(matches!(
            MerchantFile::parse(negative),
            Err(CommandError::Invalid(_))
        ));

        assert!(matches!(
            MerchantFile::parse("id: cafe\nname: '  '\n"),
            Err(CommandError::Invalid(_))
        ));
        assert!(matches!(
            MerchantFile::parse("id: ''\nname: Cafe\n"),
            Err(CommandError::Yaml(_))
        ));
    }
}
