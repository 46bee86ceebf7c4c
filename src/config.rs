//! Reporting configuration and calculation thresholds

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::path::Path;

/// Default target loss ratio (85%)
pub const DEFAULT_TARGET_LOSS_RATIO: f64 = 0.85;

/// Percent change below which a PMPM trend is "stable"
pub const TREND_THRESHOLD_PCT: f64 = 2.0;

/// Percent variance within which a PMPM is "on budget"
pub const BUDGET_THRESHOLD_PCT: f64 = 2.0;

/// Loss ratio points separating improving/declining halves
pub const LOSS_RATIO_TREND_THRESHOLD: f64 = 0.02;

/// Minimum history for OLS projections
pub const MIN_REGRESSION_POINTS: usize = 6;

/// Minimum window length before half-vs-half trend detection applies
pub const MIN_TREND_WINDOW: usize = 6;

/// Ratio multipliers for loss ratio status bands
pub const GOOD_BAND: f64 = 1.05;
pub const WARNING_BAND: f64 = 1.15;

/// Configuration for a reporting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Target loss ratio used for variance and status bands
    pub target_loss_ratio: f64,

    /// Incurred target PEPM (row 21) and fallback PEPM budget
    pub target_pepm: f64,

    /// Rolling loss ratio windows to report
    pub rolling_periods: Vec<usize>,

    /// Months of PMPM to project forward
    pub pmpm_projection_months: usize,

    /// Months of loss ratio to predict forward
    pub loss_ratio_prediction_months: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            target_loss_ratio: DEFAULT_TARGET_LOSS_RATIO,
            target_pepm: 0.0,
            rolling_periods: vec![3, 6, 12],
            pmpm_projection_months: 6,
            loss_ratio_prediction_months: 3,
        }
    }
}

impl ReportingConfig {
    /// Load configuration from a JSON file; absent keys take defaults
    pub fn from_json_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file = File::open(path)?;
        let config: ReportingConfig = serde_json::from_reader(file)?;
        Ok(config)
    }
}
