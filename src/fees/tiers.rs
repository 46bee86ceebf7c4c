//! Enrollment tier selection

use super::types::Tier;
use crate::error::{CalcError, CalcResult};

/// Outcome of applying a tier schedule
#[derive(Debug, Clone, PartialEq)]
pub struct TierResolution<'a> {
    /// Tier that fired, if any
    pub tier: Option<&'a Tier>,
    /// tier.rate × units, or 0 when no tier matched
    pub amount: f64,
}

/// Selects the applicable bracket from an ordered tier schedule
#[derive(Debug, Clone, Copy)]
pub struct TieredRateEngine<'a> {
    tiers: &'a [Tier],
}

impl<'a> TieredRateEngine<'a> {
    pub fn new(tiers: &'a [Tier]) -> Self {
        Self { tiers }
    }

    /// First tier, in listed order, whose bracket contains the enrollment
    ///
    /// With a valid schedule at most one tier can match. With overlapping
    /// brackets the earliest listed one wins.
    pub fn select(&self, enrollment: u32) -> Option<&'a Tier> {
        self.tiers.iter().find(|tier| tier.contains(enrollment))
    }

    /// Select by enrollment and price `units` at the tier's rate
    ///
    /// No match yields a zero amount; the base rate is never used as a fallback.
    pub fn resolve(&self, enrollment: u32, units: u32) -> TierResolution<'a> {
        match self.select(enrollment) {
            Some(tier) => TierResolution {
                tier: Some(tier),
                amount: tier.rate * units as f64,
            },
            None => TierResolution { tier: None, amount: 0.0 },
        }
    }

    /// Enrollment values no tier covers, as inclusive (start, end) gaps
    ///
    /// An empty result with a final unbounded tier means the schedule is
    /// exhaustive from zero upward.
    pub fn gaps(&self) -> Vec<(u32, Option<u32>)> {
        let mut gaps = Vec::new();
        let mut next_uncovered: Option<u32> = Some(0);

        for tier in self.tiers {
            let Some(start) = next_uncovered else { break };
            if tier.min_enrollment > start {
                gaps.push((start, Some(tier.min_enrollment - 1)));
            }
            next_uncovered = match tier.max_enrollment {
                Some(max) if max >= start => max.checked_add(1),
                Some(_) => next_uncovered,
                None => None,
            };
        }

        if let Some(start) = next_uncovered {
            gaps.push((start, None));
        }
        gaps
    }
}

/// Check that brackets are well formed, ascending and non-overlapping
pub fn validate_tiers(fee_id: &str, tiers: &[Tier]) -> CalcResult<()> {
    let invalid = |reason: String| CalcError::InvalidTiers {
        fee_id: fee_id.to_string(),
        reason,
    };

    for (i, tier) in tiers.iter().enumerate() {
        if let Some(max) = tier.max_enrollment {
            if max < tier.min_enrollment {
                return Err(invalid(format!(
                    "tier {} has max {} below min {}",
                    i + 1,
                    max,
                    tier.min_enrollment
                )));
            }
        }

        if i == 0 {
            continue;
        }
        let previous = &tiers[i - 1];
        match previous.max_enrollment {
            None => {
                return Err(invalid(format!(
                    "tier {} follows unbounded tier {}",
                    i + 1,
                    i
                )))
            }
            Some(prev_max) if tier.min_enrollment <= prev_max => {
                return Err(invalid(format!(
                    "tier {} starting at {} overlaps tier {} ending at {}",
                    i + 1,
                    tier.min_enrollment,
                    i,
                    prev_max
                )))
            }
            Some(_) => {}
        }
    }

    Ok(())
}
