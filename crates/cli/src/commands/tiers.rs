//! Offline tier resolution.
//!
//! # Usage
//!
//! ```bash
//! loyalty tiers resolve --file merchant.yaml --spent 110
//! ```

use std::fmt::Write as _;
use std::path::Path;

use loyalty_core::{PurchaseAmount, RewardsConfig, round2, tier_progress};

use super::CommandError;
use super::merchant::MerchantFile;

/// Resolve the tier reached by `spent` under the merchant's tiers in `path`.
///
/// # Errors
///
/// Returns an error if the file is invalid or `spent` is not a
/// non-negative number.
pub fn resolve(path: &Path, spent: &str) -> Result<String, CommandError> {
    let file = MerchantFile::load(path)?;
    report(&file.rewards, spent)
}

/// Describe where a spend total sits in a tier ladder.
fn report(rewards: &RewardsConfig, spent: &str) -> Result<String, CommandError> {
    let spent = PurchaseAmount::parse(spent)
        .map_err(|e| CommandError::Invalid(e.to_string()))?
        .value();
    let spent = round2(spent);
    let progress = tier_progress(spent, &rewards.tiers);

    let mut out = format!("spent: {spent}\n");
    match &progress.current_tier {
        Some(tier) => {
            let _ = writeln!(out, "tier: {} (discount {})", tier.name, tier.discount);
        }
        None => out.push_str("tier: none\n"),
    }
    match (&progress.next_tier, progress.remaining_to_next) {
        (Some(next), Some(remaining)) => {
            let _ = write!(out, "next: {} in {remaining}", next.name);
        }
        _ => out.push_str("next: none"),
    }
    Ok(out)
}
