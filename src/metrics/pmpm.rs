//! Per-member and per-employee cost metrics
//!
//! All functions fail fast: a zero divisor is a `DivisionByZero` error, never
//! a silent zero.

use super::regression::{project_series, Projection};
use crate::config::{BUDGET_THRESHOLD_PCT, MIN_REGRESSION_POINTS, TREND_THRESHOLD_PCT};
use crate::error::{CalcError, CalcResult};
use crate::period::Period;
use serde::{Deserialize, Serialize};

/// Total cost / member months
pub fn pmpm(total_cost: f64, member_months: f64) -> CalcResult<f64> {
    if member_months == 0.0 {
        return Err(CalcError::DivisionByZero {
            metric: "PMPM",
            divisor: "Member months",
        });
    }
    Ok(total_cost / member_months)
}

/// Total cost / employees
pub fn pepm(total_cost: f64, employees: f64) -> CalcResult<f64> {
    if employees == 0.0 {
        return Err(CalcError::DivisionByZero {
            metric: "PEPM",
            divisor: "Employees",
        });
    }
    Ok(total_cost / employees)
}

/// Enrollment × months covered
pub fn member_months(enrollment: u32, months: u32) -> f64 {
    enrollment as f64 * months as f64
}

/// Percent change from `previous`, 0 when there is no base to compare with
fn percent_change(change: f64, previous: f64) -> f64 {
    if previous != 0.0 {
        change / previous * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    /// Stable inside ±2%, otherwise the sign of the change
    pub fn classify(change_percent: f64) -> Self {
        if change_percent.abs() < TREND_THRESHOLD_PCT {
            TrendDirection::Stable
        } else if change_percent > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    }
}

/// Cost and exposure for one measurement window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PmpmInput {
    pub total_cost: f64,
    pub member_months: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PmpmTrend {
    pub current_pmpm: f64,
    pub previous_pmpm: f64,
    pub change: f64,
    pub change_percent: f64,
    pub trend: TrendDirection,
}

/// Compare current PMPM with the previous window
pub fn pmpm_with_trend(current: PmpmInput, previous: PmpmInput) -> CalcResult<PmpmTrend> {
    let current_pmpm = pmpm(current.total_cost, current.member_months)?;
    let previous_pmpm = pmpm(previous.total_cost, previous.member_months)?;
    let change = current_pmpm - previous_pmpm;
    let change_percent = percent_change(change, previous_pmpm);

    Ok(PmpmTrend {
        current_pmpm,
        previous_pmpm,
        change,
        change_percent,
        trend: TrendDirection::classify(change_percent),
    })
}

/// Cost and member months for one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCost {
    pub period: Period,
    pub total_cost: f64,
    pub member_months: f64,
}

/// Month-over-month PMPM movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPmpm {
    pub period: Period,
    pub pmpm: f64,
    pub member_months: f64,
    pub total_cost: f64,
    /// Zero for the first period
    pub change: f64,
    pub change_percent: f64,
}

/// PMPM per period with the change from the period before
pub fn monthly_trends(months: &[MonthlyCost]) -> CalcResult<Vec<MonthlyPmpm>> {
    let mut trends = Vec::with_capacity(months.len());
    let mut previous_pmpm: Option<f64> = None;

    for month in months {
        let value = pmpm(month.total_cost, month.member_months)?;
        let (change, change_percent) = match previous_pmpm {
            Some(previous) => (value - previous, percent_change(value - previous, previous)),
            None => (0.0, 0.0),
        };
        trends.push(MonthlyPmpm {
            period: month.period,
            pmpm: value,
            member_months: month.member_months,
            total_cost: month.total_cost,
            change,
            change_percent,
        });
        previous_pmpm = Some(value);
    }

    Ok(trends)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCost {
    pub category: String,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPmpm {
    pub category: String,
    pub total_cost: f64,
    pub member_months: f64,
    pub pmpm: f64,
    /// Share of the grand total, 0 when the grand total is not positive
    pub percentage: f64,
}

/// PMPM of each category over a shared member-month base
pub fn pmpm_by_category(categories: &[CategoryCost], total_member_months: f64) -> CalcResult<Vec<CategoryPmpm>> {
    if total_member_months == 0.0 {
        return Err(CalcError::DivisionByZero {
            metric: "category PMPM",
            divisor: "Total member months",
        });
    }

    let grand_total: f64 = categories.iter().map(|c| c.total_cost).sum();

    categories
        .iter()
        .map(|c| {
            Ok(CategoryPmpm {
                category: c.category.clone(),
                total_cost: c.total_cost,
                member_months: total_member_months,
                pmpm: pmpm(c.total_cost, total_member_months)?,
                percentage: if grand_total > 0.0 {
                    c.total_cost / grand_total * 100.0
                } else {
                    0.0
                },
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingPmpm {
    /// Last period of the window
    pub period: Period,
    pub rolling_pmpm: f64,
    pub rolling_total_cost: f64,
    pub rolling_member_months: f64,
}

/// Rolling PMPM over every full window of `window` periods
///
/// Returns `len - window + 1` results, or none when the series is shorter
/// than the window.
pub fn rolling_average(months: &[MonthlyCost], window: usize) -> CalcResult<Vec<RollingPmpm>> {
    if window == 0 {
        return Err(CalcError::InvalidParameter {
            name: "window",
            reason: "rolling window must cover at least one period".to_string(),
        });
    }

    months
        .windows(window)
        .map(|slice| {
            let (cost, mm) = slice
                .iter()
                .fold((0.0, 0.0), |(cost, mm), m| (cost + m.total_cost, mm + m.member_months));
            Ok(RollingPmpm {
                period: slice[slice.len() - 1].period,
                rolling_pmpm: pmpm(cost, mm)?,
                rolling_total_cost: cost,
                rolling_member_months: mm,
            })
        })
        .collect()
}

/// Reference PMPMs to compare against
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks {
    pub industry: Option<f64>,
    pub target: Option<f64>,
    pub previous: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceRanking {
    Excellent,
    Good,
    Average,
    BelowAverage,
    Poor,
}

impl PerformanceRanking {
    /// Bands on the percent difference from the industry benchmark
    pub fn from_industry_difference(percent_difference: f64) -> Self {
        if percent_difference <= -15.0 {
            PerformanceRanking::Excellent
        } else if percent_difference <= -5.0 {
            PerformanceRanking::Good
        } else if percent_difference <= 5.0 {
            PerformanceRanking::Average
        } else if percent_difference <= 15.0 {
            PerformanceRanking::BelowAverage
        } else {
            PerformanceRanking::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub difference: f64,
    pub percent_difference: f64,
    /// Actual PMPM is lower than the benchmark
    pub below_benchmark: bool,
}

impl BenchmarkComparison {
    fn new(actual: f64, benchmark: f64) -> Self {
        let difference = actual - benchmark;
        Self {
            difference,
            percent_difference: percent_change(difference, benchmark),
            below_benchmark: actual < benchmark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub vs_industry: Option<BenchmarkComparison>,
    pub vs_target: Option<BenchmarkComparison>,
    /// Within ±5% of target
    pub on_target: Option<bool>,
    pub vs_previous: Option<BenchmarkComparison>,
    pub ranking: PerformanceRanking,
}

/// Compare a PMPM against the benchmarks supplied
///
/// Ranking is `Average` when no industry benchmark is given.
pub fn benchmark(actual_pmpm: f64, benchmarks: &Benchmarks) -> BenchmarkResult {
    let vs_industry = benchmarks.industry.map(|b| BenchmarkComparison::new(actual_pmpm, b));
    let vs_target = benchmarks.target.map(|b| BenchmarkComparison::new(actual_pmpm, b));

    BenchmarkResult {
        vs_industry,
        vs_target,
        on_target: vs_target.map(|c| c.percent_difference.abs() <= 5.0),
        vs_previous: benchmarks.previous.map(|b| BenchmarkComparison::new(actual_pmpm, b)),
        ranking: vs_industry.map_or(PerformanceRanking::Average, |c| {
            PerformanceRanking::from_industry_difference(c.percent_difference)
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetStatus {
    Favorable,
    Unfavorable,
    OnBudget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub category: String,
    pub actual_pmpm: f64,
    pub budget_pmpm: f64,
    pub member_months: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmpmVariance {
    pub category: String,
    pub actual_pmpm: f64,
    pub budget_pmpm: f64,
    pub variance: f64,
    pub variance_percent: f64,
    pub dollar_impact: f64,
    pub status: BudgetStatus,
}

/// Actual versus budget PMPM for each line
pub fn variance_analysis(lines: &[BudgetLine]) -> Vec<PmpmVariance> {
    lines
        .iter()
        .map(|line| {
            let variance = line.actual_pmpm - line.budget_pmpm;
            let variance_percent = percent_change(variance, line.budget_pmpm);
            let status = if variance_percent.abs() <= BUDGET_THRESHOLD_PCT {
                BudgetStatus::OnBudget
            } else if variance < 0.0 {
                BudgetStatus::Favorable
            } else {
                BudgetStatus::Unfavorable
            };

            PmpmVariance {
                category: line.category.clone(),
                actual_pmpm: line.actual_pmpm,
                budget_pmpm: line.budget_pmpm,
                variance,
                variance_percent,
                dollar_impact: variance * line.member_months,
                status,
            }
        })
        .collect()
}

/// Linear-trend PMPM projection from at least six months of history
pub fn project_pmpm(history: &[(Period, f64)], months: usize) -> CalcResult<Vec<Projection>> {
    let Some(&(last_period, _)) = history.last() else {
        return Err(CalcError::InsufficientData {
            operation: "PMPM projection",
            required: MIN_REGRESSION_POINTS,
            available: 0,
        });
    };
    let values: Vec<f64> = history.iter().map(|(_, value)| *value).collect();
    project_series("PMPM projection", &values, last_period, months, MIN_REGRESSION_POINTS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryUsage {
    pub category: String,
    pub cost: f64,
    /// Services rendered (e.g. admits, scripts)
    pub utilization: f64,
    pub unit_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodUsage {
    pub categories: Vec<CategoryUsage>,
    pub member_months: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CostDriver {
    Utilization,
    UnitCost,
    Membership,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverImpacts {
    pub utilization_impact: f64,
    pub unit_cost_impact: f64,
    pub membership_impact: f64,
}

impl DriverImpacts {
    /// Driver with the largest absolute impact; ties go to the later driver
    pub fn primary(&self) -> CostDriver {
        [
            (CostDriver::Utilization, self.utilization_impact.abs()),
            (CostDriver::UnitCost, self.unit_cost_impact.abs()),
            (CostDriver::Membership, self.membership_impact.abs()),
        ]
        .into_iter()
        .reduce(|best, next| if best.1 > next.1 { best } else { next })
        .map_or(CostDriver::Utilization, |(driver, _)| driver)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDriverAnalysis {
    pub category: String,
    pub pmpm_change: f64,
    pub drivers: DriverImpacts,
    pub primary_driver: CostDriver,
}

/// Split each category's PMPM change into utilization, unit cost and
/// membership effects
///
/// Categories absent from the previous period report their whole PMPM as
/// change with zero impacts.
pub fn cost_drivers(current: &PeriodUsage, previous: &PeriodUsage) -> CalcResult<Vec<CostDriverAnalysis>> {
    if current.member_months == 0.0 || previous.member_months == 0.0 {
        return Err(CalcError::DivisionByZero {
            metric: "cost driver",
            divisor: "Member months",
        });
    }
    let current_mm = current.member_months;
    let previous_mm = previous.member_months;

    Ok(current
        .categories
        .iter()
        .map(|cur| {
            let Some(prev) = previous.categories.iter().find(|p| p.category == cur.category) else {
                return CostDriverAnalysis {
                    category: cur.category.clone(),
                    pmpm_change: cur.cost / current_mm,
                    drivers: DriverImpacts::default(),
                    primary_driver: CostDriver::Utilization,
                };
            };

            let drivers = DriverImpacts {
                utilization_impact: (cur.utilization - prev.utilization) * prev.unit_cost / current_mm,
                unit_cost_impact: (cur.unit_cost - prev.unit_cost) * cur.utilization / current_mm,
                membership_impact: prev.cost * (1.0 / current_mm - 1.0 / previous_mm),
            };

            CostDriverAnalysis {
                category: cur.category.clone(),
                pmpm_change: cur.cost / current_mm - prev.cost / previous_mm,
                primary_driver: drivers.primary(),
                drivers,
            }
        })
        .collect())
}
