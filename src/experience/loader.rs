//! Load experience and budget data from CSV extracts

use super::{BudgetRecord, ExperienceRecord};
use crate::period::Period;
use csv::Reader;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

/// Raw CSV row matching the monthly experience extract columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "Tenant", default)]
    tenant: Option<String>,
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "DomesticMedicalIP", default)]
    domestic_medical_ip: Option<f64>,
    #[serde(rename = "DomesticMedicalOP", default)]
    domestic_medical_op: Option<f64>,
    #[serde(rename = "NonDomesticMedical", default)]
    non_domestic_medical: Option<f64>,
    #[serde(rename = "NonHospitalMedical", default)]
    non_hospital_medical: Option<f64>,
    #[serde(rename = "RxClaims", default)]
    rx_claims: Option<f64>,
    #[serde(rename = "EECount", default)]
    ee_count: Option<u32>,
    #[serde(rename = "MemberCount", default)]
    member_count: Option<u32>,
    #[serde(rename = "Enrollment", default)]
    enrollment: Option<u32>,
    #[serde(rename = "Premiums", default)]
    premiums: Option<f64>,
    #[serde(rename = "TransactionCount", default)]
    transaction_count: Option<u32>,
}

impl CsvRow {
    fn into_record(self) -> Result<(Option<String>, ExperienceRecord), Box<dyn Error>> {
        let period = Period::parse(&self.month)?;
        let record = ExperienceRecord {
            period,
            domestic_medical_ip: self.domestic_medical_ip,
            domestic_medical_op: self.domestic_medical_op,
            non_domestic_medical: self.non_domestic_medical,
            non_hospital_medical: self.non_hospital_medical,
            rx_claims: self.rx_claims,
            ee_count: self.ee_count,
            member_count: self.member_count,
            enrollment: self.enrollment,
            premiums: self.premiums,
            transaction_count: self.transaction_count,
        };
        Ok((self.tenant, record))
    }
}

/// Raw CSV row for budget inputs
#[derive(Debug, serde::Deserialize)]
struct BudgetCsvRow {
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "PEPMBudget")]
    pepm_budget: f64,
    #[serde(rename = "BudgetEECount", default)]
    budget_ee_count: Option<u32>,
    #[serde(rename = "AnnualCumulativeBudget", default)]
    annual_cumulative_budget: Option<f64>,
}

/// Load experience records from a CSV file
pub fn load_experience<P: AsRef<Path>>(path: P) -> Result<Vec<ExperienceRecord>, Box<dyn Error>> {
    let file = std::fs::File::open(path)?;
    load_experience_from_reader(file)
}

/// Load experience records from any reader (e.g., string buffer, upload stream)
pub fn load_experience_from_reader<R: std::io::Read>(
    reader: R,
) -> Result<Vec<ExperienceRecord>, Box<dyn Error>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut records = Vec::new();

    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        let (_, record) = row.into_record()?;
        records.push(record);
    }

    Ok(records)
}

/// Load a multi-tenant experience extract, grouped by the `Tenant` column
///
/// Rows without a tenant are grouped under an empty key.
pub fn load_portfolio_from_reader<R: std::io::Read>(
    reader: R,
) -> Result<BTreeMap<String, Vec<ExperienceRecord>>, Box<dyn Error>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut portfolio: BTreeMap<String, Vec<ExperienceRecord>> = BTreeMap::new();

    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        let (tenant, record) = row.into_record()?;
        portfolio.entry(tenant.unwrap_or_default()).or_default().push(record);
    }

    Ok(portfolio)
}

/// Load budget inputs from any reader
pub fn load_budgets_from_reader<R: std::io::Read>(
    reader: R,
) -> Result<Vec<BudgetRecord>, Box<dyn Error>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut budgets = Vec::new();

    for result in csv_reader.deserialize() {
        let row: BudgetCsvRow = result?;
        budgets.push(BudgetRecord {
            period: Period::parse(&row.month)?,
            pepm_budget: row.pepm_budget,
            budget_ee_count: row.budget_ee_count,
            annual_cumulative_budget: row.annual_cumulative_budget,
        });
    }

    Ok(budgets)
}

/// Load budget inputs from a CSV file
pub fn load_budgets<P: AsRef<Path>>(path: P) -> Result<Vec<BudgetRecord>, Box<dyn Error>> {
    let file = std::fs::File::open(path)?;
    load_budgets_from_reader(file)
}
