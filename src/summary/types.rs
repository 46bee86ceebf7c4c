//! Claims and expenses summary output structures

use crate::fees::FeeCategory;
use crate::period::Period;
use serde::{Deserialize, Serialize};

/// Lines 1-7
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicalClaims {
    /// 1: domestic IP + OP
    pub domestic_medical_facility: f64,
    /// 2
    pub non_domestic_medical: f64,
    /// 3 = 1 + 2
    pub total_hospital_claims: f64,
    /// 4
    pub non_hospital_medical: f64,
    /// 5 = 3 + 4
    pub total_all_medical_claims: f64,
    /// 6 (override)
    pub uc_settlement_adjustment: f64,
    /// 7 = 5 + 6
    pub total_adjusted_medical_claims: f64,
}

/// Lines 8-9
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pharmacy {
    pub total_rx_claims: f64,
    /// Override, typically negative
    pub rx_rebates: f64,
}

/// Lines 10-11
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopLoss {
    pub total_stop_loss_fees: f64,
    /// Override, typically negative
    pub stop_loss_reimbursement: f64,
}

/// One resolved fee retained under line 13
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminFeeLine {
    pub fee_id: String,
    pub name: String,
    pub category: FeeCategory,
    pub amount: f64,
}

/// Lines 12-14
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminFees {
    /// 12
    pub consulting: f64,
    pub line_items: Vec<AdminFeeLine>,
    /// 13 = Σ line items
    pub line_items_total: f64,
    /// 14 = 12 + 13
    pub total_admin_fees: f64,
}

/// Lines 15-16
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub monthly_claims_and_expenses: f64,
    pub cumulative_claims_and_expenses: f64,
}

/// Lines 17-18
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub ee_count: u32,
    pub member_count: u32,
}

/// Lines 19-21
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PepmMetrics {
    pub non_lagged_actual: f64,
    /// Cumulative expenses over cumulative EE months
    pub non_lagged_cumulative: f64,
    pub incurred_target: f64,
}

/// Lines 22-24 plus the derived monthly budget
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub pepm_budget: f64,
    pub budget_ee_count: u32,
    /// pepm_budget × budget_ee_count
    pub monthly_budget: f64,
    pub annual_cumulative_budget: f64,
}

/// Lines 25-28
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variance {
    pub actual_monthly_difference: f64,
    pub percent_difference_monthly: f64,
    pub cumulative_difference: f64,
    pub percent_difference_cumulative: f64,
}

/// One period of the 28-line waterfall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub period: Period,
    pub medical: MedicalClaims,
    pub pharmacy: Pharmacy,
    pub stop_loss: StopLoss,
    pub admin_fees: AdminFees,
    pub totals: Totals,
    pub enrollment: Enrollment,
    pub pepm: PepmMetrics,
    pub budget: Budget,
    pub variance: Variance,
}

/// Labels of lines 1-28, in order
pub const LINE_LABELS: [&str; 28] = [
    "Domestic Medical Facility Claims (IP/OP)",
    "Non-Domestic Medical Claims (IP/OP)",
    "Total Hospital Claims",
    "Non-Hospital Medical Claims",
    "Total All Medical Claims",
    "UC Claims Settlement Adjustment",
    "Total Adjusted Medical Claims",
    "Total Rx Claims",
    "Rx Rebates",
    "Total Stop Loss Fees",
    "Stop Loss Reimbursement",
    "Consulting",
    "Admin Fee Line Items",
    "Total Admin Fees",
    "Monthly Claims and Expenses",
    "Cumulative Claims and Expenses",
    "EE Count (Active & COBRA)",
    "Member Count",
    "PEPM Non-Lagged Actual",
    "PEPM Non-Lagged Cumulative",
    "Incurred Target PEPM",
    "PEPM Budget",
    "PEPM Budget EE Count",
    "Annual Cumulative Budget",
    "Actual Monthly Difference",
    "% Difference (Monthly)",
    "Cumulative Difference",
    "% Difference (Cumulative)",
];

impl SummaryRow {
    /// Values of lines 1-28, in order
    pub fn line_values(&self) -> [f64; 28] {
        [
            self.medical.domestic_medical_facility,
            self.medical.non_domestic_medical,
            self.medical.total_hospital_claims,
            self.medical.non_hospital_medical,
            self.medical.total_all_medical_claims,
            self.medical.uc_settlement_adjustment,
            self.medical.total_adjusted_medical_claims,
            self.pharmacy.total_rx_claims,
            self.pharmacy.rx_rebates,
            self.stop_loss.total_stop_loss_fees,
            self.stop_loss.stop_loss_reimbursement,
            self.admin_fees.consulting,
            self.admin_fees.line_items_total,
            self.admin_fees.total_admin_fees,
            self.totals.monthly_claims_and_expenses,
            self.totals.cumulative_claims_and_expenses,
            self.enrollment.ee_count as f64,
            self.enrollment.member_count as f64,
            self.pepm.non_lagged_actual,
            self.pepm.non_lagged_cumulative,
            self.pepm.incurred_target,
            self.budget.pepm_budget,
            self.budget.budget_ee_count as f64,
            self.budget.annual_cumulative_budget,
            self.variance.actual_monthly_difference,
            self.variance.percent_difference_monthly,
            self.variance.cumulative_difference,
            self.variance.percent_difference_cumulative,
        ]
    }
}

/// A degraded value recorded during aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryWarning {
    pub period: Option<Period>,
    /// Summary line affected, 1-28
    pub line: Option<u8>,
    pub message: String,
}

impl SummaryWarning {
    pub fn new(period: Period, line: Option<u8>, message: impl Into<String>) -> Self {
        Self {
            period: Some(period),
            line,
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self {
            period: None,
            line: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetadata {
    pub total_periods: usize,
    /// Calendar months between the first and last period with no experience
    pub missing_periods: Vec<Period>,
    /// Share of the calendar span with experience, 0-100
    pub data_completeness: f64,
}

/// Complete waterfall for a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
    pub warnings: Vec<SummaryWarning>,
    pub metadata: SummaryMetadata,
}

impl SummaryTable {
    pub fn row(&self, period: Period) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.period == period)
    }

    pub fn last(&self) -> Option<&SummaryRow> {
        self.rows.last()
    }

    pub fn warnings_for(&self, period: Period) -> impl Iterator<Item = &SummaryWarning> {
        self.warnings.iter().filter(move |w| w.period == Some(period))
    }
}
