//! Experience data structures matching the monthly claims extract

use crate::period::Period;
use serde::{Deserialize, Serialize};

/// Claim category of an experience record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimCategory {
    DomesticMedicalIp,
    DomesticMedicalOp,
    NonDomesticMedical,
    NonHospitalMedical,
    Pharmacy,
}

impl ClaimCategory {
    pub const ALL: [ClaimCategory; 5] = [
        ClaimCategory::DomesticMedicalIp,
        ClaimCategory::DomesticMedicalOp,
        ClaimCategory::NonDomesticMedical,
        ClaimCategory::NonHospitalMedical,
        ClaimCategory::Pharmacy,
    ];

    /// Display label used in breakdowns and exports
    pub fn label(&self) -> &'static str {
        match self {
            ClaimCategory::DomesticMedicalIp => "Domestic Medical IP",
            ClaimCategory::DomesticMedicalOp => "Domestic Medical OP",
            ClaimCategory::NonDomesticMedical => "Non-Domestic Medical",
            ClaimCategory::NonHospitalMedical => "Non-Hospital Medical",
            ClaimCategory::Pharmacy => "Prescription Drugs",
        }
    }
}

/// Raw claims experience for one reporting period
///
/// Supplied by the ingestion layer and never mutated by the calculators.
/// Claim amounts and enrollment counts are optional: `None` means the extract
/// did not report the figure, which the summary table degrades to zero with a
/// warning. A reported zero is `Some(0.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    pub period: Period,

    /// Domestic facility inpatient claims
    #[serde(default)]
    pub domestic_medical_ip: Option<f64>,

    /// Domestic facility outpatient claims
    #[serde(default)]
    pub domestic_medical_op: Option<f64>,

    /// Non-domestic (out of country) medical claims
    #[serde(default)]
    pub non_domestic_medical: Option<f64>,

    /// Professional and other non-hospital medical claims
    #[serde(default)]
    pub non_hospital_medical: Option<f64>,

    /// Pharmacy claims
    #[serde(default)]
    pub rx_claims: Option<f64>,

    /// Enrolled employees (active and COBRA)
    #[serde(default)]
    pub ee_count: Option<u32>,

    /// Enrolled members
    #[serde(default)]
    pub member_count: Option<u32>,

    /// Covered lives including dependents
    #[serde(default)]
    pub enrollment: Option<u32>,

    /// Premium equivalents for the period
    #[serde(default)]
    pub premiums: Option<f64>,

    /// Claim transactions processed (per-transaction fees)
    #[serde(default)]
    pub transaction_count: Option<u32>,
}

impl ExperienceRecord {
    /// Record for a period with nothing reported
    pub fn new(period: Period) -> Self {
        Self {
            period,
            domestic_medical_ip: None,
            domestic_medical_op: None,
            non_domestic_medical: None,
            non_hospital_medical: None,
            rx_claims: None,
            ee_count: None,
            member_count: None,
            enrollment: None,
            premiums: None,
            transaction_count: None,
        }
    }

    /// Domestic facility claims, inpatient plus outpatient
    pub fn domestic_medical_facility(&self) -> f64 {
        self.domestic_medical_ip.unwrap_or(0.0) + self.domestic_medical_op.unwrap_or(0.0)
    }

    /// All medical claims before adjustments
    pub fn total_medical(&self) -> f64 {
        self.domestic_medical_facility()
            + self.non_domestic_medical.unwrap_or(0.0)
            + self.non_hospital_medical.unwrap_or(0.0)
    }

    /// Medical plus pharmacy claims
    pub fn total_claims(&self) -> f64 {
        self.total_medical() + self.rx_claims.unwrap_or(0.0)
    }

    /// Reported amount for a claim category
    pub fn claim(&self, category: ClaimCategory) -> Option<f64> {
        match category {
            ClaimCategory::DomesticMedicalIp => self.domestic_medical_ip,
            ClaimCategory::DomesticMedicalOp => self.domestic_medical_op,
            ClaimCategory::NonDomesticMedical => self.non_domestic_medical,
            ClaimCategory::NonHospitalMedical => self.non_hospital_medical,
            ClaimCategory::Pharmacy => self.rx_claims,
        }
    }

    /// Amount recorded for a claim category, 0 when not reported
    pub fn category_amount(&self, category: ClaimCategory) -> f64 {
        self.claim(category).unwrap_or(0.0)
    }
}

/// Budget inputs for one period (summary rows 22-24)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub period: Period,

    /// PEPM budget
    pub pepm_budget: f64,

    /// Budgeted employee count; the actual EE count is used when absent
    #[serde(default)]
    pub budget_ee_count: Option<u32>,

    /// Year-to-date budget; accumulated from monthly budgets when absent
    #[serde(default)]
    pub annual_cumulative_budget: Option<f64>,
}
