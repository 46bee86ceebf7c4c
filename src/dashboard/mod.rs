//! Dashboard views derived from the summary waterfall

mod budget;
mod kpis;
mod monthly;

pub use budget::{
    budget_gauge, budget_observations, category_breakdown, fuel_gauge, medical_rx_split, BudgetObservations,
    CategoryShare, FuelGauge, FuelGaugeStatus, MedicalRxSplit,
};
pub use kpis::{aggregate_kpis, DashboardKpis};
pub use monthly::{monthly_summaries, premiums_by_period, MonthlySummary, ROLLING_MONTHS};
