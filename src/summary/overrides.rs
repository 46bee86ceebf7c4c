//! User-adjustable summary lines keyed by (period, field)

use crate::error::CalcError;
use crate::period::Period;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Summary lines a user may override; all default to 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideField {
    /// Line 6
    UcSettlement,
    /// Line 9, typically negative
    RxRebates,
    /// Line 11, typically negative
    StopLossReimbursement,
}

impl OverrideField {
    pub const ALL: [OverrideField; 3] = [
        OverrideField::UcSettlement,
        OverrideField::RxRebates,
        OverrideField::StopLossReimbursement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideField::UcSettlement => "uc-settlement",
            OverrideField::RxRebates => "rx-rebates",
            OverrideField::StopLossReimbursement => "stop-loss-reimbursement",
        }
    }
}

impl fmt::Display for OverrideField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverrideField {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OverrideField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| CalcError::InvalidParameter {
                name: "override field",
                reason: format!("unknown field `{}`", s),
            })
    }
}

/// One user-entered adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentItem {
    pub id: String,
    #[serde(rename = "type")]
    pub field: OverrideField,
    pub period: Period,
    pub amount: f64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

/// Explicit override values merged into the summary during aggregation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    values: BTreeMap<(Period, OverrideField), f64>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapse adjustment items; disabled items are ignored and enabled
    /// items for the same (period, field) are summed
    pub fn from_items(items: &[AdjustmentItem]) -> Self {
        items
            .iter()
            .filter(|item| item.enabled)
            .fold(Self::new(), |mut overrides, item| {
                overrides.add(item.period, item.field, item.amount);
                overrides
            })
    }

    /// Replace the value for (period, field)
    pub fn set(&mut self, period: Period, field: OverrideField, amount: f64) {
        self.values.insert((period, field), amount);
    }

    /// Add to the value for (period, field)
    pub fn add(&mut self, period: Period, field: OverrideField, amount: f64) {
        *self.values.entry((period, field)).or_insert(0.0) += amount;
    }

    pub fn get(&self, period: Period, field: OverrideField) -> Option<f64> {
        self.values.get(&(period, field)).copied()
    }

    /// Override value, 0 when none was entered
    pub fn value(&self, period: Period, field: OverrideField) -> f64 {
        self.get(period, field).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, field: OverrideField, month: &str, amount: f64, enabled: bool) -> AdjustmentItem {
        AdjustmentItem {
            id: id.to_string(),
            field,
            period: Period::parse(month).unwrap(),
            amount,
            enabled,
            description: None,
        }
    }

    #[test]
    fn test_from_items_sums_enabled_and_skips_disabled() {
        let items = vec![
            item("a", OverrideField::RxRebates, "2024-03", -4000.0, true),
            item("b", OverrideField::RxRebates, "2024-03", -1500.0, true),
            item("c", OverrideField::RxRebates, "2024-03", -9999.0, false),
            item("d", OverrideField::UcSettlement, "2024-03", 250.0, true),
        ];
        let overrides = Overrides::from_items(&items);
        let march = Period::parse("2024-03").unwrap();

        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.value(march, OverrideField::RxRebates), -5500.0);
        assert_eq!(overrides.value(march, OverrideField::UcSettlement), 250.0);
        assert_eq!(overrides.get(march, OverrideField::StopLossReimbursement), None);
        assert_eq!(overrides.value(march, OverrideField::StopLossReimbursement), 0.0);
    }

    #[test]
    fn test_field_names() {
        for field in OverrideField::ALL {
            assert_eq!(field.as_str().parse::<OverrideField>().unwrap(), field);
        }
        assert!("rebates".parse::<OverrideField>().is_err());

        let json = r#"{"id":"x","type":"stop-loss-reimbursement","period":"2024-05","amount":-12000.0}"#;
        let parsed: AdjustmentItem = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.field, OverrideField::StopLossReimbursement);
        assert!(parsed.enabled);
    }
}
