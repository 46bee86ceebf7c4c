//! Budget gauges and claim mix views over the summary table

use crate::config::BUDGET_THRESHOLD_PCT;
use crate::experience::{ClaimCategory, ExperienceRecord};
use crate::summary::SummaryTable;
use serde::{Deserialize, Serialize};

/// Gauge thresholds in percent of budget
const GREEN_BELOW: f64 = 95.0;
const YELLOW_UP_TO: f64 = 105.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FuelGaugeStatus {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelGauge {
    pub percent_of_budget: f64,
    pub status: FuelGaugeStatus,
}

pub fn fuel_gauge(percent_of_budget: f64) -> FuelGauge {
    let status = if percent_of_budget < GREEN_BELOW {
        FuelGaugeStatus::Green
    } else if percent_of_budget <= YELLOW_UP_TO {
        FuelGaugeStatus::Yellow
    } else {
        FuelGaugeStatus::Red
    };
    FuelGauge {
        percent_of_budget,
        status,
    }
}

/// Gauge of cumulative spend against the annual cumulative budget at the
/// latest period; `None` without rows or budget
pub fn budget_gauge(table: &SummaryTable) -> Option<FuelGauge> {
    let last = table.last()?;
    let budget = last.budget.annual_cumulative_budget;
    if budget <= 0.0 {
        return None;
    }
    Some(fuel_gauge(last.totals.cumulative_claims_and_expenses / budget * 100.0))
}

/// Count of periods under, on, or over their monthly budget
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetObservations {
    pub under: usize,
    pub on: usize,
    pub over: usize,
}

/// Periods without a monthly budget are not counted
pub fn budget_observations(table: &SummaryTable) -> BudgetObservations {
    table
        .rows
        .iter()
        .filter(|row| row.budget.monthly_budget > 0.0)
        .fold(BudgetObservations::default(), |mut obs, row| {
            let pct = row.variance.percent_difference_monthly;
            if pct < -BUDGET_THRESHOLD_PCT {
                obs.under += 1;
            } else if pct > BUDGET_THRESHOLD_PCT {
                obs.over += 1;
            } else {
                obs.on += 1;
            }
            obs
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicalRxSplit {
    pub medical_percent: f64,
    pub rx_percent: f64,
}

/// Share of adjusted medical (line 7) and Rx (line 8) across all periods
pub fn medical_rx_split(table: &SummaryTable) -> MedicalRxSplit {
    let (medical, rx) = table.rows.iter().fold((0.0, 0.0), |(medical, rx), row| {
        (
            medical + row.medical.total_adjusted_medical_claims,
            rx + row.pharmacy.total_rx_claims,
        )
    });
    let total = medical + rx;
    if total == 0.0 {
        return MedicalRxSplit::default();
    }
    MedicalRxSplit {
        medical_percent: medical / total * 100.0,
        rx_percent: rx / total * 100.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: ClaimCategory,
    pub label: String,
    pub amount: f64,
    /// Share of all claims, 0-100
    pub percentage: f64,
}

/// Claim totals by category, largest first, zero categories removed
pub fn category_breakdown(experience: &[ExperienceRecord]) -> Vec<CategoryShare> {
    let totals: Vec<(ClaimCategory, f64)> = ClaimCategory::ALL
        .iter()
        .map(|&category| {
            let amount = experience.iter().map(|r| r.category_amount(category)).sum();
            (category, amount)
        })
        .collect();
    let grand_total: f64 = totals.iter().map(|(_, amount)| amount).sum();
    if grand_total == 0.0 {
        return Vec::new();
    }

    let mut shares: Vec<CategoryShare> = totals
        .into_iter()
        .filter(|(_, amount)| *amount != 0.0)
        .map(|(category, amount)| CategoryShare {
            category,
            label: category.label().to_string(),
            amount,
            percentage: amount / grand_total * 100.0,
        })
        .collect();
    shares.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experience::BudgetRecord;
    use crate::period::Period;
    use crate::summary::{Overrides, SummaryAggregator};
    use approx::assert_relative_eq;

    fn record(month: &str, medical: f64, rx: f64) -> ExperienceRecord {
        ExperienceRecord {
            domestic_medical_ip: Some(medical * 0.5),
            non_hospital_medical: Some(medical * 0.5),
            rx_claims: Some(rx),
            ee_count: Some(100),
            member_count: Some(240),
            ..ExperienceRecord::new(Period::parse(month).unwrap())
        }
    }

    #[test]
    fn test_fuel_gauge_bands() {
        assert_eq!(fuel_gauge(94.99).status, FuelGaugeStatus::Green);
        assert_eq!(fuel_gauge(95.0).status, FuelGaugeStatus::Yellow);
        assert_eq!(fuel_gauge(105.0).status, FuelGaugeStatus::Yellow);
        assert_eq!(fuel_gauge(105.01).status, FuelGaugeStatus::Red);
    }

    #[test]
    fn test_budget_gauge_and_observations() {
        let experience = vec![
            record("2024-01", 80_000.0, 20_000.0),
            record("2024-02", 100_000.0, 20_000.0),
            record("2024-03", 101_000.0, 20_000.0),
        ];
        let budgets: Vec<BudgetRecord> = experience
            .iter()
            .map(|r| BudgetRecord {
                period: r.period,
                pepm_budget: 1_200.0,
                budget_ee_count: None,
                annual_cumulative_budget: None,
            })
            .collect();
        let table = SummaryAggregator::new(1_200.0).aggregate(&experience, &[], &Overrides::new(), &budgets);

        let obs = budget_observations(&table);
        assert_eq!(obs, BudgetObservations { under: 1, on: 2, over: 0 });

        // 341k spent against 360k budgeted
        let gauge = budget_gauge(&table).unwrap();
        assert_relative_eq!(gauge.percent_of_budget, 341_000.0 / 360_000.0 * 100.0, epsilon = 1e-9);
        assert_eq!(gauge.status, FuelGaugeStatus::Green);
    }

    #[test]
    fn test_medical_rx_split() {
        let experience = vec![record("2024-01", 75_000.0, 25_000.0)];
        let table = SummaryAggregator::new(0.0).aggregate(&experience, &[], &Overrides::new(), &[]);
        let split = medical_rx_split(&table);
        assert_relative_eq!(split.medical_percent, 75.0);
        assert_relative_eq!(split.rx_percent, 25.0);

        assert_eq!(medical_rx_split(&SummaryTable::default()), MedicalRxSplit::default());
    }

    #[test]
    fn test_category_breakdown() {
        let experience = vec![record("2024-01", 60_000.0, 10_000.0), record("2024-02", 40_000.0, 30_000.0)];
        let shares = category_breakdown(&experience);

        // IP and non-hospital tie at 50k; rx at 40k; the other two categories are zero
        assert_eq!(shares.len(), 3);
        assert_eq!(shares[2].category, ClaimCategory::Pharmacy);
        assert_eq!(shares[2].label, "Prescription Drugs");
        assert_relative_eq!(shares[0].percentage, 50_000.0 / 140_000.0 * 100.0);
        let total: f64 = shares.iter().map(|s| s.percentage).sum();
        assert_relative_eq!(total, 100.0, epsilon = 1e-9);

        assert!(category_breakdown(&[record("2024-01", 0.0, 0.0)]).is_empty());
    }
}
