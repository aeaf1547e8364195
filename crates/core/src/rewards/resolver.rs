//! Tier resolution.
//!
//! Tier lists come straight out of merchant configuration, so they may be
//! empty, unsorted, or contain repeated milestones. Every function here sorts
//! its own view of the list and never fails.

use rust_decimal::Decimal;
use serde::Serialize;

use super::merchant::RewardsTier;

/// Tiers ordered by ascending milestone.
///
/// The sort is stable, so tiers sharing a milestone keep their configured
/// order.
fn sorted_by_milestone(tiers: &[RewardsTier]) -> Vec<&RewardsTier> {
    let mut sorted: Vec<&RewardsTier> = tiers.iter().collect();
    sorted.sort_by(|a, b| a.milestone.cmp(&b.milestone));
    sorted
}

/// Find the highest tier whose milestone is at or below `total_spent`.
///
/// When several tiers share the winning milestone, the one configured last
/// wins. Returns `None` if `tiers` is empty or no milestone has been reached.
///
/// ```
/// use loyalty_core::{RewardsTier, resolve_tier};
/// use rust_decimal::Decimal;
///
/// let tiers = vec![
///     RewardsTier::new("Gold", Decimal::from(500), Decimal::from(15)).unwrap(),
///     RewardsTier::new("Silver", Decimal::from(100), Decimal::from(5)).unwrap(),
/// ];
///
/// let tier = resolve_tier(Decimal::from(110), &tiers).unwrap();
/// assert_eq!(tier.name, "Silver");
/// assert!(resolve_tier(Decimal::from(99), &tiers).is_none());
/// ```
#[must_use]
pub fn resolve_tier(total_spent: Decimal, tiers: &[RewardsTier]) -> Option<&RewardsTier> {
    let mut highest = None;
    for tier in sorted_by_milestone(tiers) {
        if tier.milestone > total_spent {
            break;
        }
        highest = Some(tier);
    }
    highest
}

/// Find the first tier whose milestone is still above `total_spent`.
#[must_use]
pub fn next_tier(total_spent: Decimal, tiers: &[RewardsTier]) -> Option<&RewardsTier> {
    sorted_by_milestone(tiers)
        .into_iter()
        .find(|tier| tier.milestone > total_spent)
}

/// Where a customer stands in a merchant's tier ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierProgress {
    /// Highest tier reached by spend.
    pub current_tier: Option<RewardsTier>,
    /// Next tier above the current spend.
    pub next_tier: Option<RewardsTier>,
    /// Spend still needed to reach `next_tier`.
    pub remaining_to_next: Option<Decimal>,
}

/// Compute the current and next tier for a spend total.
#[must_use]
pub fn tier_progress(total_spent: Decimal, tiers: &[RewardsTier]) -> TierProgress {
    let next = next_tier(total_spent, tiers);
    TierProgress {
        current_tier: resolve_tier(total_spent, tiers).cloned(),
        next_tier: next.cloned(),
        remaining_to_next: next.map(|tier| tier.milestone - total_spent),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tier(name: &str, milestone: i64, discount: i64) -> RewardsTier {
        RewardsTier {
            name: name.to_owned(),
            milestone: Decimal::from(milestone),
            discount: Decimal::from(discount),
        }
    }

    fn discount_or_zero(tier: Option<&RewardsTier>) -> Decimal {
        tier.map_or(Decimal::ZERO, |t| t.discount)
    }

    fn sample_ladders() -> Vec<Vec<RewardsTier>> {
        vec![
            vec![],
            vec![tier("Base", 0, 5)],
            vec![tier("Base", 0, 0), tier("Silver", 100, 5), tier("Gold", 500, 15)],
            vec![tier("Gold", 500, 15), tier("Base", 0, 0), tier("Silver", 100, 5)],
            vec![tier("A", 50, 2), tier("B", 50, 3), tier("C", 200, 10)],
            vec![tier("Only", 1000, 25)],
        ]
    }

    fn sample_spends() -> Vec<Decimal> {
        [0_i64, 1, 49, 50, 99, 100, 101, 250, 499, 500, 999, 1000, 5000]
            .into_iter()
            .map(Decimal::from)
            .chain([Decimal::new(9999, 2), Decimal::new(10001, 2)])
            .collect()
    }

    #[test]
    fn test_empty_tiers_resolve_to_none() {
        for spend in sample_spends() {
            assert!(resolve_tier(spend, &[]).is_none());
        }
    }

    #[test]
    fn test_zero_milestone_zero_spend() {
        let tiers = vec![tier("Base", 0, 5)];
        let resolved = resolve_tier(Decimal::ZERO, &tiers).unwrap();
        assert_eq!(resolved.discount, Decimal::from(5));
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let tiers = vec![tier("Gold", 500, 15), tier("Base", 0, 0), tier("Silver", 100, 5)];
        assert_eq!(resolve_tier(Decimal::from(110), &tiers).unwrap().name, "Silver");
        assert_eq!(resolve_tier(Decimal::from(500), &tiers).unwrap().name, "Gold");
        assert_eq!(resolve_tier(Decimal::from(99), &tiers).unwrap().name, "Base");
    }

    #[test]
    fn test_equal_milestones_last_configured_wins() {
        let tiers = vec![tier("A", 50, 2), tier("B", 50, 3)];
        assert_eq!(resolve_tier(Decimal::from(75), &tiers).unwrap().name, "B");

        let reversed = vec![tier("B", 50, 3), tier("A", 50, 2)];
        assert_eq!(resolve_tier(Decimal::from(75), &reversed).unwrap().name, "A");
    }

    #[test]
    fn test_nothing_reached() {
        let tiers = vec![tier("Only", 1000, 25)];
        assert!(resolve_tier(Decimal::new(99999, 2), &tiers).is_none());
    }

    #[test]
    fn test_resolved_tier_is_highest_qualifying() {
        for tiers in sample_ladders() {
            for spend in sample_spends() {
                let Some(resolved) = resolve_tier(spend, &tiers) else {
                    assert!(tiers.iter().all(|t| t.milestone > spend));
                    continue;
                };
                assert!(resolved.milestone <= spend);
                assert!(
                    tiers
                        .iter()
                        .filter(|t| t.milestone <= spend)
                        .all(|t| t.milestone <= resolved.milestone)
                );
            }
        }
    }

    #[test]
    fn test_discount_is_monotonic_in_spend() {
        // Only holds for ladders whose discounts increase with milestone.
        let ladders = vec![
            vec![tier("Base", 0, 0), tier("Silver", 100, 5), tier("Gold", 500, 15)],
            vec![tier("Gold", 500, 15), tier("Base", 0, 0), tier("Silver", 100, 5)],
            vec![tier("Only", 1000, 25)],
        ];
        for tiers in ladders {
            let spends = sample_spends();
            for low in &spends {
                for high in spends.iter().filter(|s| *s >= low) {
                    assert!(
                        discount_or_zero(resolve_tier(*low, &tiers))
                            <= discount_or_zero(resolve_tier(*high, &tiers))
                    );
                }
            }
        }
    }

    #[test]
    fn test_next_tier_and_progress() {
        let tiers = vec![tier("Base", 0, 0), tier("Silver", 100, 5), tier("Gold", 500, 15)];

        let progress = tier_progress(Decimal::from(110), &tiers);
        assert_eq!(progress.current_tier.unwrap().name, "Silver");
        assert_eq!(progress.next_tier.unwrap().name, "Gold");
        assert_eq!(progress.remaining_to_next, Some(Decimal::from(390)));

        let top = tier_progress(Decimal::from(800), &tiers);
        assert_eq!(top.current_tier.unwrap().name, "Gold");
        assert!(top.next_tier.is_none());
        assert!(top.remaining_to_next.is_none());

        assert!(next_tier(Decimal::ZERO, &[]).is_none());
    }
}
