//! Claims Reporting - calculation engine for employer health-plan reporting
//!
//! This library provides:
//! - Fee resolution across nine rate bases, with tiers, blends and modifiers
//! - PMPM/PEPM and loss ratio metrics with rolling windows and OLS projections
//! - The 28-line monthly claims and expenses summary
//! - Dashboard KPIs, budget gauges and category breakdowns

pub mod config;
pub mod dashboard;
pub mod error;
pub mod experience;
pub mod fees;
pub mod metrics;
pub mod period;
pub mod report;
pub mod summary;

// Re-export commonly used types
pub use config::ReportingConfig;
pub use error::{CalcError, CalcResult};
pub use experience::{BudgetRecord, ExperienceRecord};
pub use fees::{resolve_fee, FeeDefinition, PeriodContext, RateBasis, ResolvedFee};
pub use period::Period;
pub use report::{ReportRunner, TenantReport};
pub use summary::{Overrides, SummaryAggregator, SummaryRow, SummaryTable};
