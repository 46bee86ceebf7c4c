//! Load user adjustment items from CSV

use super::overrides::{AdjustmentItem, OverrideField, Overrides};
use crate::period::Period;
use csv::Reader;
use std::error::Error;
use std::path::Path;

/// Raw CSV row for adjustment items
#[derive(Debug, serde::Deserialize)]
struct AdjustmentCsvRow {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Type")]
    field: String,
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Enabled", default)]
    enabled: Option<bool>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
}

/// Load adjustment items from any reader
///
/// A blank `Enabled` column counts as enabled.
pub fn load_adjustments_from_reader<R: std::io::Read>(
    reader: R,
) -> Result<Vec<AdjustmentItem>, Box<dyn Error>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut items = Vec::new();

    for result in csv_reader.deserialize() {
        let row: AdjustmentCsvRow = result?;
        items.push(AdjustmentItem {
            id: row.id,
            field: row.field.parse::<OverrideField>()?,
            period: Period::parse(&row.month)?,
            amount: row.amount,
            enabled: row.enabled.unwrap_or(true),
            description: row.description.filter(|d| !d.is_empty()),
        });
    }

    Ok(items)
}

/// Load adjustment items from a CSV file and collapse them into overrides
pub fn load_overrides<P: AsRef<Path>>(path: P) -> Result<Overrides, Box<dyn Error>> {
    let file = std::fs::File::open(path)?;
    let items = load_adjustments_from_reader(file)?;
    Ok(Overrides::from_items(&items))
}
