//! Loss ratio calculations
//!
//! Loss ratio = (claims + fees) / premiums. Every function here is fail-fast:
//! zero premiums raise `ZeroPremiums`, short histories `InsufficientData`.

use super::regression::{project_series, Projection};
use crate::config::{
    GOOD_BAND, LOSS_RATIO_TREND_THRESHOLD, MIN_REGRESSION_POINTS, MIN_TREND_WINDOW, WARNING_BAND,
};
use crate::error::{CalcError, CalcResult};
use crate::period::Period;
use serde::{Deserialize, Serialize};

/// (claims + fees) / premiums
pub fn monthly_loss_ratio(claims: f64, fees: f64, premiums: f64) -> CalcResult<f64> {
    if premiums == 0.0 {
        return Err(CalcError::ZeroPremiums);
    }
    Ok((claims + fees) / premiums)
}

/// Claims, fees and premiums for one measurement
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LossRatioInput {
    pub claims: f64,
    pub fees: f64,
    pub premiums: f64,
}

impl LossRatioInput {
    pub fn new(claims: f64, fees: f64, premiums: f64) -> Self {
        Self { claims, fees, premiums }
    }

    pub fn loss_ratio(&self) -> CalcResult<f64> {
        monthly_loss_ratio(self.claims, self.fees, self.premiums)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossRatioStatus {
    Good,
    Warning,
    Critical,
}

impl LossRatioStatus {
    /// Good within 5% above target, warning within 15%, critical beyond
    pub fn classify(loss_ratio: f64, target: f64) -> Self {
        if loss_ratio <= target * GOOD_BAND {
            LossRatioStatus::Good
        } else if loss_ratio <= target * WARNING_BAND {
            LossRatioStatus::Warning
        } else {
            LossRatioStatus::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossRatioResult {
    pub loss_ratio: f64,
    /// (ratio - target) / target × 100
    pub variance_percent: f64,
    pub status: LossRatioStatus,
}

/// Loss ratio with its variance from target and status band
pub fn loss_ratio_with_target(input: &LossRatioInput, target: f64) -> CalcResult<LossRatioResult> {
    if target == 0.0 {
        return Err(CalcError::DivisionByZero {
            metric: "loss ratio variance",
            divisor: "Target loss ratio",
        });
    }
    let loss_ratio = input.loss_ratio()?;

    Ok(LossRatioResult {
        loss_ratio,
        variance_percent: (loss_ratio - target) / target * 100.0,
        status: LossRatioStatus::classify(loss_ratio, target),
    })
}

/// One period of loss ratio inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyExperience {
    pub period: Period,
    pub claims: f64,
    pub fees: f64,
    pub premiums: f64,
}

impl MonthlyExperience {
    pub fn input(&self) -> LossRatioInput {
        LossRatioInput::new(self.claims, self.fees, self.premiums)
    }
}

fn summed(months: &[MonthlyExperience]) -> LossRatioInput {
    months.iter().fold(LossRatioInput::default(), |acc, m| LossRatioInput {
        claims: acc.claims + m.claims,
        fees: acc.fees + m.fees,
        premiums: acc.premiums + m.premiums,
    })
}

/// Pooled ratio, 0 when there are no premiums to pool
fn pooled_ratio(months: &[MonthlyExperience]) -> f64 {
    let totals = summed(months);
    if totals.premiums > 0.0 {
        (totals.claims + totals.fees) / totals.premiums
    } else {
        0.0
    }
}

fn trailing(months: &[MonthlyExperience], n: usize) -> &[MonthlyExperience] {
    &months[months.len().saturating_sub(n)..]
}

/// Pooled loss ratio over the trailing `n` periods, or all of them when
/// fewer than `n` exist
pub fn rolling_loss_ratio(months: &[MonthlyExperience], n: usize) -> CalcResult<f64> {
    if months.is_empty() {
        return Err(CalcError::EmptyInput("rolling loss ratio"));
    }
    if n == 0 {
        return Err(CalcError::InvalidParameter {
            name: "periods",
            reason: "rolling window must cover at least one period".to_string(),
        });
    }
    summed(trailing(months, n)).loss_ratio()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingWindowResult {
    pub end_period: Period,
    pub window_size: usize,
    pub loss_ratio: f64,
    pub trend: RatioTrend,
}

/// Rolling loss ratio for each requested window length
///
/// Windows longer than the history, or whose premiums sum to zero, are
/// skipped. Windows of six or more periods compare the pooled ratio of their
/// first half with their second half.
pub fn rolling_loss_ratios(months: &[MonthlyExperience], windows: &[usize]) -> Vec<RollingWindowResult> {
    let Some(last) = months.last() else {
        return Vec::new();
    };

    windows
        .iter()
        .filter(|&&size| size > 0 && months.len() >= size)
        .filter_map(|&size| {
            let window = trailing(months, size);
            let loss_ratio = summed(window).loss_ratio().ok()?;

            let trend = if size >= MIN_TREND_WINDOW {
                let (first, second) = window.split_at(size / 2);
                let (first, second) = (pooled_ratio(first), pooled_ratio(second));
                if second < first - LOSS_RATIO_TREND_THRESHOLD {
                    RatioTrend::Improving
                } else if second > first + LOSS_RATIO_TREND_THRESHOLD {
                    RatioTrend::Declining
                } else {
                    RatioTrend::Stable
                }
            } else {
                RatioTrend::Stable
            };

            Some(RollingWindowResult {
                end_period: last.period,
                window_size: size,
                loss_ratio,
                trend,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthRatio {
    pub period: Period,
    pub loss_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossRatioSummary {
    pub average_loss_ratio: f64,
    pub best_month: MonthRatio,
    pub worst_month: MonthRatio,
    /// Population standard deviation of the monthly ratios
    pub volatility: f64,
    pub months_on_target: usize,
    pub months_above_target: usize,
    /// Σ |ratio - target|
    pub total_variance: f64,
}

/// Summary statistics over the monthly ratios
pub fn summary_stats(months: &[MonthlyExperience], target: f64) -> CalcResult<LossRatioSummary> {
    let ratios = months
        .iter()
        .map(|m| {
            Ok(MonthRatio {
                period: m.period,
                loss_ratio: m.input().loss_ratio()?,
            })
        })
        .collect::<CalcResult<Vec<_>>>()?;

    let Some(&first) = ratios.first() else {
        return Err(CalcError::EmptyInput("loss ratio summary"));
    };

    let n = ratios.len() as f64;
    let average = ratios.iter().map(|r| r.loss_ratio).sum::<f64>() / n;
    let best_month = ratios
        .iter()
        .fold(first, |best, r| if r.loss_ratio < best.loss_ratio { *r } else { best });
    let worst_month = ratios
        .iter()
        .fold(first, |worst, r| if r.loss_ratio > worst.loss_ratio { *r } else { worst });
    let variance = ratios.iter().map(|r| (r.loss_ratio - average).powi(2)).sum::<f64>() / n;

    Ok(LossRatioSummary {
        average_loss_ratio: average,
        best_month,
        worst_month,
        volatility: variance.sqrt(),
        months_on_target: ratios.iter().filter(|r| r.loss_ratio <= target * GOOD_BAND).count(),
        months_above_target: ratios.iter().filter(|r| r.loss_ratio > target).count(),
        total_variance: ratios.iter().map(|r| (r.loss_ratio - target).abs()).sum(),
    })
}

/// Linear-trend loss ratio prediction from at least six months of history
pub fn predict_loss_ratio(months: &[MonthlyExperience], horizon: usize) -> CalcResult<Vec<Projection>> {
    if months.len() < MIN_REGRESSION_POINTS {
        return Err(CalcError::InsufficientData {
            operation: "loss ratio prediction",
            required: MIN_REGRESSION_POINTS,
            available: months.len(),
        });
    }
    let ratios = months
        .iter()
        .map(|m| m.input().loss_ratio())
        .collect::<CalcResult<Vec<_>>>()?;
    let last_period = months[months.len() - 1].period;

    project_series("loss ratio prediction", &ratios, last_period, horizon, MIN_REGRESSION_POINTS)
}

/// Deltas applied to a loss ratio input
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactChanges {
    pub claims_change: f64,
    pub fees_change: f64,
    pub premiums_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossRatioImpact {
    pub current_loss_ratio: f64,
    pub new_loss_ratio: f64,
    pub impact: f64,
    /// Relative to the current ratio; 0 when the current ratio is 0
    pub impact_percent: f64,
}

/// What-if: loss ratio after applying the changes
pub fn simulate_impact(current: &LossRatioInput, changes: &ImpactChanges) -> CalcResult<LossRatioImpact> {
    let current_loss_ratio = current.loss_ratio()?;
    let new_loss_ratio = monthly_loss_ratio(
        current.claims + changes.claims_change,
        current.fees + changes.fees_change,
        current.premiums + changes.premiums_change,
    )?;
    let impact = new_loss_ratio - current_loss_ratio;

    Ok(LossRatioImpact {
        current_loss_ratio,
        new_loss_ratio,
        impact,
        impact_percent: if current_loss_ratio != 0.0 {
            impact / current_loss_ratio * 100.0
        } else {
            0.0
        },
    })
}

/// Loss ratio analysis over one ordered experience series
#[derive(Debug, Clone)]
pub struct LossRatioEngine {
    target_loss_ratio: f64,
    months: Vec<MonthlyExperience>,
}

impl LossRatioEngine {
    /// Create an engine over the series, ordered by period
    pub fn new(target_loss_ratio: f64, mut months: Vec<MonthlyExperience>) -> Self {
        months.sort_by_key(|m| m.period);
        Self {
            target_loss_ratio,
            months,
        }
    }

    pub fn target(&self) -> f64 {
        self.target_loss_ratio
    }

    pub fn months(&self) -> &[MonthlyExperience] {
        &self.months
    }

    /// Latest period's ratio against target
    pub fn latest(&self) -> CalcResult<LossRatioResult> {
        let last = self.months.last().ok_or(CalcError::EmptyInput("loss ratio"))?;
        loss_ratio_with_target(&last.input(), self.target_loss_ratio)
    }

    pub fn rolling(&self, n: usize) -> CalcResult<f64> {
        rolling_loss_ratio(&self.months, n)
    }

    pub fn rolling_windows(&self, windows: &[usize]) -> Vec<RollingWindowResult> {
        rolling_loss_ratios(&self.months, windows)
    }

    pub fn summary(&self) -> CalcResult<LossRatioSummary> {
        summary_stats(&self.months, self.target_loss_ratio)
    }

    pub fn predict(&self, horizon: usize) -> CalcResult<Vec<Projection>> {
        predict_loss_ratio(&self.months, horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn twelve_months() -> Vec<MonthlyExperience> {
        let start = Period::parse("2024-01").unwrap();
        (0..12)
            .map(|i| MonthlyExperience {
                period: start.plus_months(i),
                claims: 80_000.0 + i as f64 * 1000.0,
                fees: 15_000.0 + i as f64 * 100.0,
                premiums: 120_000.0,
            })
            .collect()
    }

    #[test]
    fn test_monthly_loss_ratio() {
        assert_relative_eq!(monthly_loss_ratio(80_000.0, 20_000.0, 120_000.0).unwrap(), 0.833333, epsilon = 1e-6);
        assert_eq!(monthly_loss_ratio(0.0, 0.0, 50_000.0).unwrap(), 0.0);
        assert_eq!(monthly_loss_ratio(1.0, 1.0, 0.0), Err(CalcError::ZeroPremiums));
    }

    #[test]
    fn test_ratio_is_exact() {
        for (claims, fees, premiums) in [(1.0, 2.0, 3.0), (123_456.78, 9_876.54, 150_000.0), (0.0, 5.0, 0.1)] {
            assert_eq!(monthly_loss_ratio(claims, fees, premiums).unwrap(), (claims + fees) / premiums);
        }
    }

    #[test]
    fn test_status_bands() {
        let target = 0.85;
        let at = |ratio: f64| loss_ratio_with_target(&LossRatioInput::new(ratio * 1000.0, 0.0, 1000.0), target).unwrap();

        assert_eq!(at(0.80).status, LossRatioStatus::Good);
        assert_eq!(at(0.89).status, LossRatioStatus::Good);
        assert_eq!(at(0.95).status, LossRatioStatus::Warning);
        assert_eq!(at(1.00).status, LossRatioStatus::Critical);
        assert_relative_eq!(at(0.935).variance_percent, 10.0, epsilon = 1e-9);

        let err = loss_ratio_with_target(&LossRatioInput::new(1.0, 0.0, 1.0), 0.0).unwrap_err();
        assert!(matches!(err, CalcError::DivisionByZero { .. }));
    }

    #[test]
    fn test_rolling_uses_available_history() {
        let months = twelve_months();
        let three = &months[..3];

        let expected = (80_000.0 + 81_000.0 + 82_000.0 + 15_000.0 + 15_100.0 + 15_200.0) / 360_000.0;
        assert_relative_eq!(rolling_loss_ratio(three, 12).unwrap(), expected, epsilon = 1e-12);
        assert_eq!(
            rolling_loss_ratio(&[], 12),
            Err(CalcError::EmptyInput("rolling loss ratio"))
        );

        let no_premium = vec![MonthlyExperience { premiums: 0.0, ..months[0] }];
        assert_eq!(rolling_loss_ratio(&no_premium, 3), Err(CalcError::ZeroPremiums));
    }

    #[test]
    fn test_rolling_windows_with_trend() {
        let months = twelve_months();
        let results = rolling_loss_ratios(&months, &[3, 6, 12, 24]);

        // 24 exceeds the history and is skipped
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.end_period.to_string() == "2024-12"));

        let twelve = results.iter().find(|r| r.window_size == 12).unwrap();
        assert_relative_eq!(twelve.loss_ratio, 1_212_600.0 / 1_440_000.0, epsilon = 1e-12);
        assert!(twelve.loss_ratio > 0.0 && twelve.loss_ratio < 2.0);
        // First half pools to 0.8146, second half to 0.8696
        assert_eq!(twelve.trend, RatioTrend::Declining);

        let three = results.iter().find(|r| r.window_size == 3).unwrap();
        assert_eq!(three.trend, RatioTrend::Stable);
    }

    #[test]
    fn test_improving_trend() {
        let mut months = twelve_months();
        months.reverse();
        let start = Period::parse("2024-01").unwrap();
        for (i, m) in months.iter_mut().enumerate() {
            m.period = start.plus_months(i as u32);
        }
        let results = rolling_loss_ratios(&months, &[12]);
        assert_eq!(results[0].trend, RatioTrend::Improving);
    }

    #[test]
    fn test_summary_stats() {
        let start = Period::parse("2024-01").unwrap();
        let months: Vec<MonthlyExperience> = [0.80, 0.90, 0.85, 0.90]
            .iter()
            .enumerate()
            .map(|(i, &ratio)| MonthlyExperience {
                period: start.plus_months(i as u32),
                claims: ratio * 100_000.0,
                fees: 0.0,
                premiums: 100_000.0,
            })
            .collect();

        let summary = summary_stats(&months, 0.85).unwrap();
        assert_relative_eq!(summary.average_loss_ratio, 0.8625, epsilon = 1e-12);
        assert_eq!(summary.best_month.period.to_string(), "2024-01");
        // Ties keep the earliest month
        assert_eq!(summary.worst_month.period.to_string(), "2024-02");
        // 0.90 sits above the 0.8925 good band
        assert_eq!(summary.months_on_target, 2);
        assert_eq!(summary.months_above_target, 2);
        assert_relative_eq!(summary.total_variance, 0.15, epsilon = 1e-12);
        assert_relative_eq!(summary.volatility, 0.0414578, epsilon = 1e-6);

        assert_eq!(summary_stats(&[], 0.85), Err(CalcError::EmptyInput("loss ratio summary")));
    }

    #[test]
    fn test_predict_loss_ratio() {
        let months = twelve_months();
        let predictions = predict_loss_ratio(&months, 3).unwrap();

        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[0].future_period.to_string(), "2025-01");
        assert_eq!(predictions[2].future_period.to_string(), "2025-03");
        for p in &predictions {
            assert!(p.predicted_value >= 0.0);
            assert!((0.0..=1.0).contains(&p.confidence));
        }
        // Linear inputs give an exact fit
        assert_relative_eq!(predictions[0].confidence, 1.0, epsilon = 1e-9);

        assert!(matches!(
            predict_loss_ratio(&months[..5], 3),
            Err(CalcError::InsufficientData { required: 6, available: 5, .. })
        ));
    }

    #[test]
    fn test_simulate_impact() {
        let current = LossRatioInput::new(80_000.0, 20_000.0, 125_000.0);

        let none = simulate_impact(&current, &ImpactChanges::default()).unwrap();
        assert_eq!(none.impact, 0.0);
        assert_eq!(none.impact_percent, 0.0);

        let changed = simulate_impact(
            &current,
            &ImpactChanges {
                claims_change: 10_000.0,
                ..Default::default()
            },
        )
        .unwrap();
        assert_relative_eq!(changed.new_loss_ratio, 0.88, epsilon = 1e-12);
        assert_relative_eq!(changed.impact, 0.08, epsilon = 1e-12);
        assert_relative_eq!(changed.impact_percent, 10.0, epsilon = 1e-9);

        let zero = simulate_impact(&LossRatioInput::new(0.0, 0.0, 100.0), &ImpactChanges { fees_change: 10.0, ..Default::default() }).unwrap();
        assert_abs_diff_eq!(zero.impact_percent, 0.0);
    }

    #[test]
    fn test_engine() {
        let mut months = twelve_months();
        months.swap(0, 11);
        let engine = LossRatioEngine::new(0.90, months);

        assert_eq!(engine.months()[0].period.to_string(), "2024-01");
        assert_eq!(engine.latest().unwrap().status, LossRatioStatus::Good);
        assert_eq!(engine.rolling_windows(&[3, 6, 12]).len(), 3);
        assert!(engine.summary().is_ok());
        assert_eq!(engine.predict(2).unwrap().len(), 2);

        let empty = LossRatioEngine::new(0.85, Vec::new());
        assert!(empty.latest().is_err());
    }
}
