//! Closed-form ordinary least squares over an index series
//!
//! x is the position in the series (0, 1, 2, ...), y the observed value.

use crate::error::{CalcError, CalcResult};
use crate::period::Period;
use serde::{Deserialize, Serialize};

/// Fitted line y = slope * x + intercept
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    /// Fit a line through `values` indexed from zero
    ///
    /// Needs at least two points. A flat series has no variance to explain:
    /// R² is 1 when the line reproduces it exactly and 0 otherwise.
    pub fn fit(values: &[f64]) -> CalcResult<Self> {
        if values.len() < 2 {
            return Err(CalcError::InsufficientData {
                operation: "linear regression",
                required: 2,
                available: values.len(),
            });
        }

        let n = values.len() as f64;
        let (sum_x, sum_y, sum_xy, sum_xx) = values.iter().enumerate().fold(
            (0.0, 0.0, 0.0, 0.0),
            |(sx, sy, sxy, sxx), (i, &y)| {
                let x = i as f64;
                (sx + x, sy + y, sxy + x * y, sxx + x * x)
            },
        );

        let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
        let intercept = (sum_y - slope * sum_x) / n;

        let mean_y = sum_y / n;
        let (ss_tot, ss_res) = values.iter().enumerate().fold((0.0, 0.0), |(tot, res), (i, &y)| {
            let predicted = slope * i as f64 + intercept;
            (tot + (y - mean_y).powi(2), res + (y - predicted).powi(2))
        });

        let r_squared = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res <= f64::EPSILON {
            1.0
        } else {
            0.0
        };

        Ok(Self {
            slope,
            intercept,
            r_squared,
        })
    }

    /// Fitted value at position x
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// R² clamped into [0, 1]
    pub fn confidence(&self) -> f64 {
        self.r_squared.clamp(0.0, 1.0)
    }
}

/// One forward-projected period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub future_period: Period,
    /// Never negative
    pub predicted_value: f64,
    /// In [0, 1]
    pub confidence: f64,
}

/// Extend the fitted trend of `history` by `horizon` months past `last_period`
///
/// Fails with `InsufficientData` when `history` is shorter than `min_points`.
pub fn project_series(
    operation: &'static str,
    history: &[f64],
    last_period: Period,
    horizon: usize,
    min_points: usize,
) -> CalcResult<Vec<Projection>> {
    if history.len() < min_points {
        return Err(CalcError::InsufficientData {
            operation,
            required: min_points,
            available: history.len(),
        });
    }

    let fit = LinearFit::fit(history)?;
    let confidence = fit.confidence();
    let n = history.len();

    Ok((1..=horizon)
        .map(|step| Projection {
            future_period: last_period.plus_months(step as u32),
            predicted_value: fit.predict((n + step - 1) as f64).max(0.0),
            confidence,
        })
        .collect())
}
