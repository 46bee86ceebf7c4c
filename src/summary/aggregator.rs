//! 28-line claims and expenses waterfall
//!
//! Periods are folded in ascending order; each row depends on the running
//! totals of the rows before it. Unlike the calculators it wraps, the
//! aggregator never fails: missing inputs and zero divisors produce 0 and a
//! recorded warning so that a partial table still renders.

use super::overrides::{OverrideField, Overrides};
use super::types::{
    AdminFeeLine, AdminFees, Budget, Enrollment, MedicalClaims, PepmMetrics, Pharmacy, StopLoss,
    SummaryMetadata, SummaryRow, SummaryTable, SummaryWarning, Totals, Variance,
};
use crate::config::ReportingConfig;
use crate::experience::{BudgetRecord, ExperienceRecord};
use crate::fees::{resolve_fee, FeeCategory, FeeDefinition, PeriodContext};
use crate::period::Period;
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Running totals carried from one period into the next
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CumulativeTotals {
    /// Line 16 of the previous period
    pub claims_and_expenses: f64,
    /// Σ EE count through the previous period
    pub ee_months: u64,
    /// Line 24 of the previous period
    pub budget: f64,
}

/// Everything one period's row is computed from
#[derive(Debug, Clone, Copy)]
pub struct PeriodInputs<'a> {
    pub experience: &'a ExperienceRecord,
    pub fees: &'a [FeeDefinition],
    pub overrides: &'a Overrides,
    pub budget: Option<&'a BudgetRecord>,
}

/// A computed row with the totals to carry forward
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub row: SummaryRow,
    pub totals: CumulativeTotals,
    pub warnings: Vec<SummaryWarning>,
}

/// Warnings for one period, mirrored to the log as they are recorded
struct WarningLog {
    period: Period,
    entries: Vec<SummaryWarning>,
}

impl WarningLog {
    fn new(period: Period) -> Self {
        Self {
            period,
            entries: Vec::new(),
        }
    }

    fn record(&mut self, line: Option<u8>, message: String) {
        warn!("{}: {}", self.period, message);
        self.entries.push(SummaryWarning::new(self.period, line, message));
    }

    /// Reported input value, or 0 with a warning when the extract left it out
    fn reported(&mut self, line: u8, value: Option<f64>, name: &str) -> f64 {
        value.unwrap_or_else(|| {
            self.record(Some(line), format!("{} missing; treated as 0", name));
            0.0
        })
    }

    /// numerator / divisor, or 0 with a warning on a zero divisor
    fn ratio_or_zero(&mut self, line: u8, numerator: f64, divisor: f64, divisor_name: &str) -> f64 {
        if divisor == 0.0 {
            self.record(Some(line), format!("{} is zero; line {} set to 0", divisor_name, line));
            0.0
        } else {
            numerator / divisor
        }
    }
}

/// Resolve a fee without letting its failure escape the aggregator
///
/// This is the only place calculator errors cross into the summary: an
/// error becomes a zero amount plus a warning, and a resolved fee's own
/// warnings are carried over.
fn resolve_or_warn(fee: &FeeDefinition, context: &PeriodContext, log: &mut WarningLog) -> f64 {
    match resolve_fee(fee, context) {
        Ok(resolved) => {
            for message in resolved.warnings {
                log.record(None, format!("fee `{}`: {}", fee.id, message));
            }
            resolved.amount
        }
        Err(err) => {
            log.record(None, format!("fee `{}` not resolved ({}); amount set to 0", fee.id, err));
            0.0
        }
    }
}

#[derive(Default)]
struct Accumulator {
    rows: Vec<SummaryRow>,
    totals: CumulativeTotals,
    warnings: Vec<SummaryWarning>,
}

/// Builds the claims and expenses summary
#[derive(Debug, Clone)]
pub struct SummaryAggregator {
    /// Line 21 and the PEPM budget when no budget record exists
    target_pepm: f64,
}

impl SummaryAggregator {
    pub fn new(target_pepm: f64) -> Self {
        Self { target_pepm }
    }

    pub fn from_config(config: &ReportingConfig) -> Self {
        Self::new(config.target_pepm)
    }

    /// Compute one period's row from its inputs and the prior running totals
    pub fn compute_row(&self, inputs: &PeriodInputs<'_>, prior: &CumulativeTotals) -> RowOutcome {
        let record = inputs.experience;
        let period = record.period;
        let mut log = WarningLog::new(period);

        // 1-7
        let domestic_medical_facility = log.reported(1, record.domestic_medical_ip, "Domestic medical IP claims")
            + log.reported(1, record.domestic_medical_op, "Domestic medical OP claims");
        let non_domestic_medical = log.reported(2, record.non_domestic_medical, "Non-domestic medical claims");
        let non_hospital_medical = log.reported(4, record.non_hospital_medical, "Non-hospital medical claims");
        let total_hospital_claims = domestic_medical_facility + non_domestic_medical;
        let total_all_medical_claims = total_hospital_claims + non_hospital_medical;
        let uc_settlement_adjustment = inputs.overrides.value(period, OverrideField::UcSettlement);
        let medical = MedicalClaims {
            domestic_medical_facility,
            non_domestic_medical,
            total_hospital_claims,
            non_hospital_medical,
            total_all_medical_claims,
            uc_settlement_adjustment,
            total_adjusted_medical_claims: total_all_medical_claims + uc_settlement_adjustment,
        };

        // 8-9
        let pharmacy = Pharmacy {
            total_rx_claims: log.reported(8, record.rx_claims, "Rx claims"),
            rx_rebates: inputs.overrides.value(period, OverrideField::RxRebates),
        };

        // 10-14
        let context = PeriodContext::from_experience(
            record,
            medical.total_adjusted_medical_claims + pharmacy.total_rx_claims,
        );
        let mut total_stop_loss_fees = 0.0;
        let mut consulting = 0.0;
        let mut line_items = Vec::new();
        for fee in inputs.fees.iter().filter(|fee| fee.is_active(period)) {
            let amount = resolve_or_warn(fee, &context, &mut log);
            match fee.category {
                FeeCategory::StopLoss => total_stop_loss_fees += amount,
                FeeCategory::Consulting => consulting += amount,
                category => line_items.push(AdminFeeLine {
                    fee_id: fee.id.clone(),
                    name: fee.name.clone(),
                    category,
                    amount,
                }),
            }
        }

        let stop_loss = StopLoss {
            total_stop_loss_fees,
            stop_loss_reimbursement: inputs
                .overrides
                .value(period, OverrideField::StopLossReimbursement),
        };

        let line_items_total: f64 = line_items.iter().map(|item| item.amount).sum();
        let admin_fees = AdminFees {
            consulting,
            line_items,
            line_items_total,
            total_admin_fees: consulting + line_items_total,
        };

        // 15-16
        let monthly = medical.total_adjusted_medical_claims
            + pharmacy.total_rx_claims
            + pharmacy.rx_rebates
            + stop_loss.total_stop_loss_fees
            + stop_loss.stop_loss_reimbursement
            + admin_fees.total_admin_fees;
        let cumulative = prior.claims_and_expenses + monthly;

        // 17-18
        let ee_count = record.ee_count.unwrap_or_else(|| {
            log.record(Some(17), "EE count missing; treated as 0".to_string());
            0
        });
        let member_count = record.member_count.unwrap_or_else(|| {
            log.record(Some(18), "Member count missing; treated as 0".to_string());
            0
        });
        let ee_months = prior.ee_months + u64::from(ee_count);

        // 19-21
        let pepm = PepmMetrics {
            non_lagged_actual: log.ratio_or_zero(19, monthly, ee_count as f64, "EE count"),
            non_lagged_cumulative: log.ratio_or_zero(20, cumulative, ee_months as f64, "Cumulative EE months"),
            incurred_target: self.target_pepm,
        };

        // 22-24
        let pepm_budget = inputs.budget.map_or(self.target_pepm, |b| b.pepm_budget);
        let budget_ee_count = inputs.budget.and_then(|b| b.budget_ee_count).unwrap_or(ee_count);
        let monthly_budget = pepm_budget * budget_ee_count as f64;
        let annual_cumulative_budget = inputs
            .budget
            .and_then(|b| b.annual_cumulative_budget)
            .unwrap_or(prior.budget + monthly_budget);
        let budget = Budget {
            pepm_budget,
            budget_ee_count,
            monthly_budget,
            annual_cumulative_budget,
        };

        // 25-28
        let actual_monthly_difference = monthly - monthly_budget;
        let cumulative_difference = cumulative - annual_cumulative_budget;
        let variance = Variance {
            actual_monthly_difference,
            percent_difference_monthly: 100.0
                * log.ratio_or_zero(26, actual_monthly_difference, monthly_budget, "Monthly budget"),
            cumulative_difference,
            percent_difference_cumulative: 100.0
                * log.ratio_or_zero(28, cumulative_difference, annual_cumulative_budget, "Cumulative budget"),
        };

        RowOutcome {
            row: SummaryRow {
                period,
                medical,
                pharmacy,
                stop_loss,
                admin_fees,
                totals: Totals {
                    monthly_claims_and_expenses: monthly,
                    cumulative_claims_and_expenses: cumulative,
                },
                enrollment: Enrollment {
                    ee_count,
                    member_count,
                },
                pepm,
                budget,
                variance,
            },
            totals: CumulativeTotals {
                claims_and_expenses: cumulative,
                ee_months,
                budget: annual_cumulative_budget,
            },
            warnings: log.entries,
        }
    }

    /// Fold every period of the experience series into a summary table
    ///
    /// Records are ordered by period first; a second record for a period
    /// already summarised is skipped with a warning.
    pub fn aggregate(
        &self,
        experience: &[ExperienceRecord],
        fees: &[FeeDefinition],
        overrides: &Overrides,
        budgets: &[BudgetRecord],
    ) -> SummaryTable {
        if experience.is_empty() {
            warn!("No experience data provided; summary is empty");
            return SummaryTable {
                warnings: vec![SummaryWarning::general("No experience data provided")],
                ..SummaryTable::default()
            };
        }

        let mut ordered: Vec<&ExperienceRecord> = experience.iter().collect();
        ordered.sort_by_key(|record| record.period);
        let budgets: BTreeMap<Period, &BudgetRecord> = budgets.iter().map(|b| (b.period, b)).collect();

        let acc = ordered.into_iter().fold(Accumulator::default(), |mut acc, record| {
            if acc.rows.last().map_or(false, |row| row.period == record.period) {
                let message = "Duplicate experience record skipped".to_string();
                warn!("{}: {}", record.period, message);
                acc.warnings.push(SummaryWarning::new(record.period, None, message));
                return acc;
            }

            let inputs = PeriodInputs {
                experience: record,
                fees,
                overrides,
                budget: budgets.get(&record.period).copied(),
            };
            let outcome = self.compute_row(&inputs, &acc.totals);
            acc.rows.push(outcome.row);
            acc.warnings.extend(outcome.warnings);
            acc.totals = outcome.totals;
            acc
        });

        let metadata = metadata_for(&acc.rows);
        info!(
            "Summarised {} periods ({} warnings, {:.1}% complete)",
            metadata.total_periods,
            acc.warnings.len(),
            metadata.data_completeness
        );

        SummaryTable {
            rows: acc.rows,
            warnings: acc.warnings,
            metadata,
        }
    }
}

fn metadata_for(rows: &[SummaryRow]) -> SummaryMetadata {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return SummaryMetadata::default();
    };

    let present: BTreeSet<Period> = rows.iter().map(|row| row.period).collect();
    let span = last.period.months_since(&first.period) + 1;
    let missing_periods: Vec<Period> = (0..span)
        .map(|offset| first.period.plus_months(offset as u32))
        .filter(|period| !present.contains(period))
        .collect();

    SummaryMetadata {
        total_periods: rows.len(),
        missing_periods,
        data_completeness: rows.len() as f64 / span as f64 * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::RateBasis;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn period(key: &str) -> Period {
        Period::parse(key).unwrap()
    }

    fn record(key: &str, ee: u32) -> ExperienceRecord {
        ExperienceRecord {
            domestic_medical_ip: Some(40_000.0),
            domestic_medical_op: Some(20_000.0),
            non_domestic_medical: Some(5_000.0),
            non_hospital_medical: Some(15_000.0),
            rx_claims: Some(12_000.0),
            ee_count: Some(ee),
            member_count: Some(ee * 2),
            enrollment: Some(ee * 2),
            premiums: Some(130_000.0),
            ..ExperienceRecord::new(period(key))
        }
    }

    fn year_of_records() -> Vec<ExperienceRecord> {
        (0..12)
            .map(|i| {
                let mut r = record(&period("2024-01").plus_months(i).to_string(), 100 + i);
                r.rx_claims = Some(12_000.0 + 500.0 * i as f64);
                r
            })
            .collect()
    }

    fn jan_2024() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn fee_schedule() -> Vec<FeeDefinition> {
        vec![
            FeeDefinition::new("stop-loss", FeeCategory::StopLoss, RateBasis::Pepm, jan_2024()).with_base_amount(80.0),
            FeeDefinition::new("consult", FeeCategory::Consulting, RateBasis::Flat, jan_2024()).with_base_amount(2_500.0),
            FeeDefinition::new("tpa", FeeCategory::Administrative, RateBasis::Pepm, jan_2024()).with_base_amount(35.0),
            FeeDefinition::new("rx-admin", FeeCategory::AddOn, RateBasis::Pmpm, jan_2024()).with_base_amount(2.0),
        ]
    }

    #[test]
    fn test_single_row_lines() {
        let aggregator = SummaryAggregator::new(900.0);
        let rec = record("2024-01", 100);
        let fees = fee_schedule();
        let mut overrides = Overrides::new();
        overrides.set(rec.period, OverrideField::UcSettlement, -1_000.0);
        overrides.set(rec.period, OverrideField::RxRebates, -3_000.0);
        overrides.set(rec.period, OverrideField::StopLossReimbursement, -4_000.0);

        let inputs = PeriodInputs {
            experience: &rec,
            fees: &fees,
            overrides: &overrides,
            budget: None,
        };
        let outcome = aggregator.compute_row(&inputs, &CumulativeTotals::default());
        let lines = outcome.row.line_values();

        assert_eq!(lines[0], 60_000.0);
        assert_eq!(lines[2], 65_000.0);
        assert_eq!(lines[4], 80_000.0);
        assert_eq!(lines[6], 79_000.0);
        assert_eq!(lines[9], 8_000.0);
        assert_eq!(lines[11], 2_500.0);
        assert_eq!(lines[12], 3_500.0 + 400.0);
        assert_eq!(lines[13], 2_500.0 + 3_900.0);
        assert_eq!(outcome.row.admin_fees.line_items.len(), 2);

        // 7 + 8 + 9 + 10 + 11 + 14, reimbursement and rebates signed
        let expected = 79_000.0 + 12_000.0 - 3_000.0 + 8_000.0 - 4_000.0 + 6_400.0;
        assert_relative_eq!(lines[14], expected, epsilon = 1e-9);
        assert_relative_eq!(lines[15], expected, epsilon = 1e-9);
        assert_relative_eq!(lines[18], expected / 100.0, epsilon = 1e-9);
        assert_eq!(lines[20], 900.0);

        // Budget falls back to target PEPM × EE count
        assert_eq!(lines[21], 900.0);
        assert_eq!(lines[22], 100.0);
        assert_eq!(lines[23], 90_000.0);
        assert_relative_eq!(lines[24], expected - 90_000.0, epsilon = 1e-9);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_cumulative_is_running_sum_of_monthly() {
        let table = SummaryAggregator::new(950.0).aggregate(&year_of_records(), &fee_schedule(), &Overrides::new(), &[]);
        assert_eq!(table.rows.len(), 12);

        let mut running = 0.0;
        let mut ee_months = 0.0;
        for (i, row) in table.rows.iter().enumerate() {
            running += row.totals.monthly_claims_and_expenses;
            ee_months += row.enrollment.ee_count as f64;
            assert_relative_eq!(row.totals.cumulative_claims_and_expenses, running, max_relative = 1e-12);
            assert_relative_eq!(row.pepm.non_lagged_cumulative, running / ee_months, max_relative = 1e-12);
            if i > 0 {
                let previous = &table.rows[i - 1];
                assert_relative_eq!(
                    row.totals.cumulative_claims_and_expenses,
                    previous.totals.cumulative_claims_and_expenses + row.totals.monthly_claims_and_expenses,
                    max_relative = 1e-12
                );
                assert!(row.period > previous.period);
            }
        }
        assert_eq!(table.metadata.total_periods, 12);
        assert!(table.metadata.missing_periods.is_empty());
        assert_eq!(table.metadata.data_completeness, 100.0);
    }

    #[test]
    fn test_zero_ee_count_degrades_one_month() {
        let mut records = year_of_records();
        records[3].ee_count = Some(0);

        let table = SummaryAggregator::new(950.0).aggregate(&records, &[], &Overrides::new(), &[]);
        assert_eq!(table.rows.len(), 12);

        let april = &table.rows[3];
        assert_eq!(april.pepm.non_lagged_actual, 0.0);
        assert!(table.warnings_for(april.period).any(|w| w.line == Some(19)));

        let may = &table.rows[4];
        assert_relative_eq!(
            may.pepm.non_lagged_actual,
            may.totals.monthly_claims_and_expenses / 104.0,
            epsilon = 1e-9
        );
        assert_eq!(table.warnings_for(may.period).count(), 0);
    }

    #[test]
    fn test_missing_claim_inputs_degrade_with_warnings() {
        let mut rec = record("2024-01", 100);
        rec.domestic_medical_op = None;
        rec.non_domestic_medical = None;
        rec.non_hospital_medical = None;
        rec.rx_claims = None;
        let reported_zero = ExperienceRecord {
            non_domestic_medical: Some(0.0),
            ..record("2024-02", 100)
        };

        let table = SummaryAggregator::new(950.0).aggregate(&[rec, reported_zero], &[], &Overrides::new(), &[]);
        let jan = &table.rows[0];
        assert_eq!(jan.medical.domestic_medical_facility, 40_000.0);
        assert_eq!(jan.medical.non_domestic_medical, 0.0);
        assert_eq!(jan.medical.non_hospital_medical, 0.0);
        assert_eq!(jan.pharmacy.total_rx_claims, 0.0);
        assert_eq!(jan.totals.monthly_claims_and_expenses, 40_000.0);

        let lines: Vec<u8> = table.warnings_for(jan.period).filter_map(|w| w.line).collect();
        assert_eq!(lines, vec![1, 2, 4, 8]);

        // A reported zero is not missing
        assert_eq!(table.warnings_for(period("2024-02")).count(), 0);
    }

    #[test]
    fn test_negative_divisor_is_not_treated_as_zero() {
        let records = vec![record("2024-01", 100)];
        let budgets = vec![BudgetRecord {
            period: period("2024-01"),
            pepm_budget: -100.0,
            budget_ee_count: None,
            annual_cumulative_budget: None,
        }];

        let table = SummaryAggregator::new(0.0).aggregate(&records, &[], &Overrides::new(), &budgets);
        let row = &table.rows[0];
        assert_eq!(row.budget.monthly_budget, -10_000.0);
        assert_relative_eq!(
            row.variance.percent_difference_monthly,
            (92_000.0 + 10_000.0) / -10_000.0 * 100.0,
            epsilon = 1e-9
        );
        assert!(table.warnings.is_empty());
    }

    #[test]
    fn test_aggregation_is_idempotent_and_order_independent() {
        let aggregator = SummaryAggregator::new(950.0);
        let records = year_of_records();
        let fees = fee_schedule();

        let first = aggregator.aggregate(&records, &fees, &Overrides::new(), &[]);
        let second = aggregator.aggregate(&records, &fees, &Overrides::new(), &[]);
        assert_eq!(first, second);

        let mut shuffled = records.clone();
        shuffled.reverse();
        assert_eq!(aggregator.aggregate(&shuffled, &fees, &Overrides::new(), &[]), first);
    }

    #[test]
    fn test_fee_errors_become_warnings() {
        let mut rec = record("2024-01", 50);
        rec.premiums = None;
        let fees = vec![
            FeeDefinition::new("pct", FeeCategory::Performance, RateBasis::PercentPremium, jan_2024()).with_percentage(1.0),
            FeeDefinition::new("flat", FeeCategory::Administrative, RateBasis::Flat, jan_2024()).with_base_amount(100.0),
        ];

        let table = SummaryAggregator::new(0.0).aggregate(&[rec], &fees, &Overrides::new(), &[]);
        let row = &table.rows[0];
        assert_eq!(row.admin_fees.line_items_total, 100.0);
        assert!(table.warnings.iter().any(|w| w.message.contains("`pct`")));
    }

    #[test]
    fn test_inactive_fees_are_not_resolved() {
        let fees = vec![FeeDefinition::new("late", FeeCategory::Consulting, RateBasis::Flat, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .with_base_amount(1_000.0)];
        let table = SummaryAggregator::new(950.0).aggregate(&year_of_records(), &fees, &Overrides::new(), &[]);

        assert_eq!(table.rows[4].admin_fees.consulting, 0.0);
        assert_eq!(table.rows[5].admin_fees.consulting, 1_000.0);
    }

    #[test]
    fn test_budget_records_drive_variance() {
        let records = vec![record("2024-01", 100), record("2024-02", 100)];
        let budgets = vec![
            BudgetRecord {
                period: period("2024-01"),
                pepm_budget: 1_000.0,
                budget_ee_count: Some(110),
                annual_cumulative_budget: None,
            },
            BudgetRecord {
                period: period("2024-02"),
                pepm_budget: 1_000.0,
                budget_ee_count: None,
                annual_cumulative_budget: Some(250_000.0),
            },
        ];

        let table = SummaryAggregator::new(0.0).aggregate(&records, &[], &Overrides::new(), &budgets);
        let (jan, feb) = (&table.rows[0], &table.rows[1]);

        assert_eq!(jan.budget.monthly_budget, 110_000.0);
        assert_eq!(jan.budget.annual_cumulative_budget, 110_000.0);
        assert_relative_eq!(jan.variance.actual_monthly_difference, 92_000.0 - 110_000.0);
        assert_relative_eq!(jan.variance.percent_difference_monthly, -18_000.0 / 110_000.0 * 100.0, epsilon = 1e-9);

        assert_eq!(feb.budget.budget_ee_count, 100);
        assert_eq!(feb.budget.annual_cumulative_budget, 250_000.0);
        assert_relative_eq!(feb.variance.cumulative_difference, 184_000.0 - 250_000.0);
    }

    #[test]
    fn test_zero_budget_warns() {
        let table = SummaryAggregator::new(0.0).aggregate(&[record("2024-01", 10)], &[], &Overrides::new(), &[]);
        let row = &table.rows[0];
        assert_eq!(row.variance.percent_difference_monthly, 0.0);
        assert_eq!(row.variance.percent_difference_cumulative, 0.0);
        assert!(table.warnings.iter().any(|w| w.line == Some(26)));
        assert!(table.warnings.iter().any(|w| w.line == Some(28)));
    }

    #[test]
    fn test_gaps_duplicates_and_empty_input() {
        let records = vec![record("2024-01", 10), record("2024-04", 10), record("2024-01", 99)];
        let table = SummaryAggregator::new(100.0).aggregate(&records, &[], &Overrides::new(), &[]);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].enrollment.ee_count, 10);
        assert_eq!(table.metadata.missing_periods, vec![period("2024-02"), period("2024-03")]);
        assert_relative_eq!(table.metadata.data_completeness, 50.0);
        assert!(table.warnings.iter().any(|w| w.message.contains("Duplicate")));

        let empty = SummaryAggregator::new(100.0).aggregate(&[], &[], &Overrides::new(), &[]);
        assert!(empty.rows.is_empty());
        assert_eq!(empty.warnings.len(), 1);
    }
}
