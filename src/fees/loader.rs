//! Load fee definitions from JSON

use super::tiers::validate_tiers;
use super::types::FeeDefinition;
use std::error::Error;
use std::fs::File;
use std::path::Path;

/// Load fee definitions from a JSON array file
pub fn load_fee_definitions<P: AsRef<Path>>(path: P) -> Result<Vec<FeeDefinition>, Box<dyn Error>> {
    let file = File::open(path)?;
    load_fee_definitions_from_reader(file)
}

/// Load fee definitions from any reader
///
/// Tier schedules are validated up front so a malformed bracket list fails
/// the load rather than resolving to zero later.
pub fn load_fee_definitions_from_reader<R: std::io::Read>(
    reader: R,
) -> Result<Vec<FeeDefinition>, Box<dyn Error>> {
    let fees: Vec<FeeDefinition> = serde_json::from_reader(reader)?;

    for fee in &fees {
        if fee.tiering_enabled {
            validate_tiers(&fee.id, &fee.tiers)?;
        }
    }

    log::info!("Loaded {} fee definitions", fees.len());
    Ok(fees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::types::{FeeCategory, RateBasis};

    #[test]
    fn test_load_fee_definitions() {
        let json = r#"[
            {
                "id": "stop-loss",
                "name": "Specific stop loss",
                "category": "stop_loss",
                "rate_basis": "pepm",
                "base_amount": 85.0,
                "effective_start": "2024-01-01"
            },
            {
                "id": "tpa",
                "category": "administrative",
                "rate_basis": "pmpm",
                "tiering_enabled": true,
                "tiers": [
                    {"min_enrollment": 0, "max_enrollment": 1000, "rate": 5.0},
                    {"min_enrollment": 1001, "rate": 4.5, "label": "large"}
                ],
                "effective_start": "2024-01-01",
                "effective_end": "2024-12-31"
            },
            {
                "id": "blend",
                "category": "add_on",
                "rate_basis": "blended",
                "blended_components": [
                    {"type": "fixed", "value": 100.0},
                    {"type": "percent_premium", "value": 2.0, "label": "premium share"}
                ],
                "effective_start": "2024-01-01"
            }
        ]"#;

        let fees = load_fee_definitions_from_reader(json.as_bytes()).unwrap();
        assert_eq!(fees.len(), 3);
        assert_eq!(fees[0].category, FeeCategory::StopLoss);
        assert_eq!(fees[1].rate_basis, RateBasis::Pmpm);
        assert_eq!(fees[1].tiers[1].max_enrollment, None);
        assert_eq!(fees[2].blended_components.len(), 2);
    }

    #[test]
    fn test_overlapping_tiers_fail_the_load() {
        let json = r#"[{
            "id": "tpa",
            "category": "administrative",
            "rate_basis": "pmpm",
            "tiering_enabled": true,
            "tiers": [
                {"min_enrollment": 0, "max_enrollment": 1000, "rate": 5.0},
                {"min_enrollment": 900, "rate": 4.5}
            ],
            "effective_start": "2024-01-01"
        }]"#;

        let err = load_fee_definitions_from_reader(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("tpa"));
    }
}
