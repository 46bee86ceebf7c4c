//! Per-period dashboard figures folded from the summary waterfall

use crate::experience::ExperienceRecord;
use crate::metrics::loss_ratio::{rolling_loss_ratio, MonthlyExperience};
use crate::period::Period;
use crate::summary::{SummaryRow, SummaryTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Months pooled by the rolling loss ratio shown on the dashboard
pub const ROLLING_MONTHS: usize = 12;

/// One period of dashboard figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub period: Period,
    /// Adjusted medical + Rx + rebates (lines 7, 8, 9)
    pub claims: f64,
    /// Stop loss net of reimbursement plus admin fees (lines 10, 11, 14)
    pub fees: f64,
    pub premiums: f64,
    /// claims + fees, equal to line 15
    pub total_cost: f64,
    /// 0 when the period has no premiums
    pub monthly_loss_ratio: f64,
    /// Pooled over up to the trailing 12 periods, 0 when they have no premiums
    pub rolling_12_loss_ratio: f64,
    /// Percent above (positive) or below target
    pub variance: f64,
    pub member_months: f64,
    /// claims / member months, 0 without members
    pub pmpm: f64,
}

/// Premium equivalents keyed by period
pub fn premiums_by_period(experience: &[ExperienceRecord]) -> BTreeMap<Period, f64> {
    experience
        .iter()
        .filter_map(|record| record.premiums.map(|premiums| (record.period, premiums)))
        .collect()
}

fn claims_of(row: &SummaryRow) -> f64 {
    row.medical.total_adjusted_medical_claims + row.pharmacy.total_rx_claims + row.pharmacy.rx_rebates
}

fn fees_of(row: &SummaryRow) -> f64 {
    row.stop_loss.total_stop_loss_fees + row.stop_loss.stop_loss_reimbursement + row.admin_fees.total_admin_fees
}

/// Fold the summary rows into monthly dashboard figures
///
/// Missing premiums degrade the period's ratios to 0 rather than failing.
pub fn monthly_summaries(
    table: &SummaryTable,
    premiums: &BTreeMap<Period, f64>,
    target_loss_ratio: f64,
) -> Vec<MonthlySummary> {
    table
        .rows
        .iter()
        .fold(
            (Vec::with_capacity(table.rows.len()), Vec::<MonthlyExperience>::new()),
            |(mut summaries, mut history), row| {
                let claims = claims_of(row);
                let fees = fees_of(row);
                let premium = premiums.get(&row.period).copied().unwrap_or(0.0);
                history.push(MonthlyExperience {
                    period: row.period,
                    claims,
                    fees,
                    premiums: premium,
                });

                let monthly_loss_ratio = if premium > 0.0 { (claims + fees) / premium } else { 0.0 };
                let rolling_12_loss_ratio = rolling_loss_ratio(&history, ROLLING_MONTHS).unwrap_or(0.0);
                let member_months = row.enrollment.member_count as f64;

                summaries.push(MonthlySummary {
                    period: row.period,
                    claims,
                    fees,
                    premiums: premium,
                    total_cost: claims + fees,
                    monthly_loss_ratio,
                    rolling_12_loss_ratio,
                    variance: if target_loss_ratio > 0.0 {
                        (monthly_loss_ratio - target_loss_ratio) / target_loss_ratio * 100.0
                    } else {
                        0.0
                    },
                    member_months,
                    pmpm: if member_months > 0.0 { claims / member_months } else { 0.0 },
                });
                (summaries, history)
            },
        )
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{Overrides, SummaryAggregator};
    use approx::assert_relative_eq;

    fn records(n: u32) -> Vec<ExperienceRecord> {
        let start = Period::parse("2024-01").unwrap();
        (0..n)
            .map(|i| ExperienceRecord {
                non_hospital_medical: Some(90_000.0),
                rx_claims: Some(10_000.0),
                ee_count: Some(100),
                member_count: Some(250),
                premiums: if i == 2 { None } else { Some(125_000.0) },
                ..ExperienceRecord::new(start.plus_months(i))
            })
            .collect()
    }

    #[test]
    fn test_monthly_summaries() {
        let experience = records(14);
        let table = SummaryAggregator::new(0.0).aggregate(&experience, &[], &Overrides::new(), &[]);
        let summaries = monthly_summaries(&table, &premiums_by_period(&experience), 0.85);

        assert_eq!(summaries.len(), 14);
        let jan = &summaries[0];
        assert_eq!(jan.claims, 100_000.0);
        assert_eq!(jan.total_cost, table.rows[0].totals.monthly_claims_and_expenses);
        assert_relative_eq!(jan.monthly_loss_ratio, 0.8);
        assert_relative_eq!(jan.variance, (0.8 - 0.85) / 0.85 * 100.0, epsilon = 1e-9);
        assert_relative_eq!(jan.pmpm, 400.0);

        // Missing premiums: ratio degrades to zero, rolling still pools the rest
        let march = &summaries[2];
        assert_eq!(march.monthly_loss_ratio, 0.0);
        assert_relative_eq!(march.rolling_12_loss_ratio, 300_000.0 / 250_000.0, epsilon = 1e-12);

        // Trailing twelve of fourteen periods still include March
        let last = &summaries[13];
        assert_relative_eq!(last.rolling_12_loss_ratio, 1_200_000.0 / 1_375_000.0, epsilon = 1e-12);
    }
}
