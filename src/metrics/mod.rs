//! Cost-rate metrics: PMPM/PEPM, loss ratios and trend projection

pub mod loss_ratio;
pub mod pmpm;
pub mod regression;

pub use loss_ratio::{
    loss_ratio_with_target, monthly_loss_ratio, predict_loss_ratio, rolling_loss_ratio,
    rolling_loss_ratios, simulate_impact, summary_stats, ImpactChanges, LossRatioEngine,
    LossRatioImpact, LossRatioInput, LossRatioResult, LossRatioStatus, LossRatioSummary,
    MonthlyExperience, RatioTrend, RollingWindowResult,
};
pub use pmpm::{member_months, pepm, pmpm, project_pmpm, MonthlyCost, TrendDirection};
pub use regression::{LinearFit, Projection};
