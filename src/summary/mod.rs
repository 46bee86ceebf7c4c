//! Claims and expenses summary: overrides, row types and the waterfall fold

mod aggregator;
pub mod loader;
mod overrides;
mod types;

pub use aggregator::{CumulativeTotals, PeriodInputs, RowOutcome, SummaryAggregator};
pub use loader::{load_adjustments_from_reader, load_overrides};
pub use overrides::{AdjustmentItem, OverrideField, Overrides};
pub use types::{
    AdminFeeLine, AdminFees, Budget, Enrollment, MedicalClaims, PepmMetrics, Pharmacy, StopLoss,
    SummaryMetadata, SummaryRow, SummaryTable, SummaryWarning, Totals, Variance, LINE_LABELS,
};
