//! Portfolio KPIs reduced from monthly dashboard figures

use super::monthly::MonthlySummary;
use serde::{Deserialize, Serialize};

/// Portfolio-level KPIs over a series of monthly summaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardKpis {
    pub total_claims: f64,
    pub total_cost: f64,
    /// Monthly loss ratios weighted by premium, 0 when no premiums were
    /// recorded; a month without premiums contributes nothing
    pub avg_loss_ratio: f64,
    /// Claims per member month
    pub avg_claim: f64,
    /// Average monthly membership, rounded
    pub total_members: u64,
    /// Mean of the monthly PMPMs
    pub avg_pmpm: f64,
}

#[derive(Default)]
struct Accumulator {
    claims: f64,
    cost: f64,
    weighted_loss_ratio: f64,
    premiums: f64,
    member_months: f64,
    pmpm: f64,
    count: usize,
}

/// Reduce monthly summaries to dashboard KPIs; empty input gives all zeros
pub fn aggregate_kpis(summaries: &[MonthlySummary]) -> DashboardKpis {
    let acc = summaries.iter().fold(Accumulator::default(), |acc, s| Accumulator {
        claims: acc.claims + s.claims,
        cost: acc.cost + s.total_cost,
        weighted_loss_ratio: acc.weighted_loss_ratio + s.monthly_loss_ratio * s.premiums,
        premiums: acc.premiums + s.premiums,
        member_months: acc.member_months + s.member_months,
        pmpm: acc.pmpm + s.pmpm,
        count: acc.count + 1,
    });

    if acc.count == 0 {
        return DashboardKpis::default();
    }

    DashboardKpis {
        total_claims: acc.claims,
        total_cost: acc.cost,
        avg_loss_ratio: if acc.premiums > 0.0 {
            acc.weighted_loss_ratio / acc.premiums
        } else {
            0.0
        },
        avg_claim: if acc.member_months > 0.0 {
            acc.claims / acc.member_months
        } else {
            0.0
        },
        total_members: (acc.member_months / acc.count as f64).round() as u64,
        avg_pmpm: acc.pmpm / acc.count as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;
    use approx::assert_relative_eq;

    fn summary(month: &str, claims: f64, fees: f64, premiums: f64, members: f64) -> MonthlySummary {
        MonthlySummary {
            period: Period::parse(month).unwrap(),
            claims,
            fees,
            premiums,
            total_cost: claims + fees,
            monthly_loss_ratio: if premiums > 0.0 { (claims + fees) / premiums } else { 0.0 },
            rolling_12_loss_ratio: 0.0,
            variance: 0.0,
            member_months: members,
            pmpm: if members > 0.0 { claims / members } else { 0.0 },
        }
    }

    #[test]
    fn test_aggregate_kpis() {
        let summaries = vec![
            summary("2024-01", 100_000.0, 10_000.0, 120_000.0, 250.0),
            summary("2024-02", 80_000.0, 10_000.0, 80_000.0, 251.0),
        ];
        let kpis = aggregate_kpis(&summaries);

        assert_eq!(kpis.total_claims, 180_000.0);
        assert_eq!(kpis.total_cost, 200_000.0);
        // Weighted by premium: 200k / 200k, not the mean of 0.9167 and 1.125
        assert_relative_eq!(kpis.avg_loss_ratio, 1.0, epsilon = 1e-12);
        assert_relative_eq!(kpis.avg_claim, 180_000.0 / 501.0);
        assert_eq!(kpis.total_members, 251);
        assert_relative_eq!(kpis.avg_pmpm, (400.0 + 80_000.0 / 251.0) / 2.0);
    }

    #[test]
    fn test_month_without_premiums_does_not_weigh_on_loss_ratio() {
        let summaries = vec![
            summary("2024-01", 90_000.0, 10_000.0, 100_000.0, 200.0),
            summary("2024-02", 45_000.0, 5_000.0, 0.0, 200.0),
        ];
        let kpis = aggregate_kpis(&summaries);

        assert_eq!(summaries[1].monthly_loss_ratio, 0.0);
        assert_relative_eq!(kpis.avg_loss_ratio, 1.0, epsilon = 1e-12);
        assert_eq!(kpis.total_cost, 150_000.0);
    }

    #[test]
    fn test_empty_and_zero_premium_series() {
        assert_eq!(aggregate_kpis(&[]), DashboardKpis::default());

        let kpis = aggregate_kpis(&[summary("2024-01", 50_000.0, 0.0, 0.0, 0.0)]);
        assert_eq!(kpis.avg_loss_ratio, 0.0);
        assert_eq!(kpis.avg_claim, 0.0);
        assert_eq!(kpis.total_members, 0);
        assert_eq!(kpis.total_claims, 50_000.0);
    }
}
