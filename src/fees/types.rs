//! Fee definition structures and resolved fee output

use crate::error::CalcError;
use crate::experience::ExperienceRecord;
use crate::period::Period;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fee computation formula family
///
/// Tiering is not a basis of its own: it modifies `Pmpm` and `Pepm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RateBasis {
    /// Fixed monthly amount
    Flat,
    /// Per member per month
    Pmpm,
    /// Per employee per month
    Pepm,
    /// Percentage of premium
    PercentPremium,
    /// Percentage of claims
    PercentClaims,
    /// Per processed transaction
    PerTransaction,
    /// Sum of heterogeneous components (e.g. $100 + 2% of premium)
    Blended,
    /// Separate member and dependent rates
    Composite,
    /// Manually entered total
    Manual,
}

impl RateBasis {
    pub const ALL: [RateBasis; 9] = [
        RateBasis::Flat,
        RateBasis::Pmpm,
        RateBasis::Pepm,
        RateBasis::PercentPremium,
        RateBasis::PercentClaims,
        RateBasis::PerTransaction,
        RateBasis::Blended,
        RateBasis::Composite,
        RateBasis::Manual,
    ];

    /// Wire name of the basis
    pub fn as_str(&self) -> &'static str {
        match self {
            RateBasis::Flat => "flat",
            RateBasis::Pmpm => "pmpm",
            RateBasis::Pepm => "pepm",
            RateBasis::PercentPremium => "percent_premium",
            RateBasis::PercentClaims => "percent_claims",
            RateBasis::PerTransaction => "per_transaction",
            RateBasis::Blended => "blended",
            RateBasis::Composite => "composite",
            RateBasis::Manual => "manual",
        }
    }

    /// Whether enrollment tiers may replace the base rate
    pub fn supports_tiering(&self) -> bool {
        matches!(self, RateBasis::Pmpm | RateBasis::Pepm)
    }
}

impl fmt::Display for RateBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateBasis {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RateBasis::ALL
            .iter()
            .copied()
            .find(|basis| basis.as_str() == s)
            .ok_or_else(|| CalcError::InvalidRateBasis(s.to_string()))
    }
}

impl TryFrom<String> for RateBasis {
    type Error = CalcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RateBasis> for String {
    fn from(basis: RateBasis) -> Self {
        basis.as_str().to_string()
    }
}

/// Where a fee lands in the claims and expenses summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeCategory {
    /// Stop loss premium (row 10)
    StopLoss,
    /// Consulting (row 12)
    Consulting,
    /// Admin/management fees (row 13)
    Administrative,
    /// Performance-based fees (row 13)
    Performance,
    /// Optional add-on services (row 13)
    AddOn,
    /// Credits/offsets, usually negative (row 13)
    Credit,
    /// One-time adjustments (row 13)
    Adjustment,
}

/// Enrollment bracket with its rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Inclusive lower bound
    pub min_enrollment: u32,
    /// Inclusive upper bound (None = unbounded)
    #[serde(default)]
    pub max_enrollment: Option<u32>,
    pub rate: f64,
    #[serde(default)]
    pub label: Option<String>,
}

impl Tier {
    pub fn new(min_enrollment: u32, max_enrollment: Option<u32>, rate: f64) -> Self {
        Self {
            min_enrollment,
            max_enrollment,
            rate,
            label: None,
        }
    }

    /// Whether the enrollment falls in this bracket
    pub fn contains(&self, enrollment: u32) -> bool {
        enrollment >= self.min_enrollment && self.max_enrollment.map_or(true, |max| enrollment <= max)
    }
}

/// Formula of one blended component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Fixed,
    Pmpm,
    PercentPremium,
    PercentClaims,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Fixed => "fixed",
            ComponentKind::Pmpm => "pmpm",
            ComponentKind::PercentPremium => "percent_premium",
            ComponentKind::PercentClaims => "percent_claims",
        }
    }
}

/// One component of a blended fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendedComponent {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    /// Amount for fixed/pmpm, percentage (0-100) for the percent kinds
    pub value: f64,
    #[serde(default)]
    pub label: Option<String>,
}

impl BlendedComponent {
    pub fn new(kind: ComponentKind, value: f64) -> Self {
        Self { kind, value, label: None }
    }
}

/// Member and dependent rates of a composite fee
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeRate {
    pub member_rate: f64,
    pub dependent_rate: f64,
}

/// Multiplier applied in listed calendar months
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalModifier {
    pub name: String,
    /// Calendar months (1-12)
    pub months: Vec<u32>,
    /// e.g. 1.1 for a 10% increase
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationKind {
    Percentage,
    FixedAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationFrequency {
    Monthly,
    Quarterly,
    Annual,
}

impl EscalationFrequency {
    /// Completed escalation steps after `months` elapsed
    pub fn steps(&self, months: u32) -> u32 {
        match self {
            EscalationFrequency::Monthly => months,
            EscalationFrequency::Quarterly => months / 3,
            EscalationFrequency::Annual => months / 12,
        }
    }
}

/// Automatic escalation measured from the fee's effective start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationSchedule {
    #[serde(rename = "type")]
    pub kind: EscalationKind,
    /// Percent per step, or dollars per step
    pub value: f64,
    pub frequency: EscalationFrequency,
    #[serde(default)]
    pub compounding: bool,
}

/// Caps and floors on the resolved amount
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateConstraints {
    #[serde(default)]
    pub min_amount: Option<f64>,
    #[serde(default)]
    pub max_amount: Option<f64>,
    #[serde(default)]
    pub min_per_member: Option<f64>,
    #[serde(default)]
    pub max_per_member: Option<f64>,
}

impl RateConstraints {
    pub fn uses_enrollment(&self) -> bool {
        self.min_per_member.is_some() || self.max_per_member.is_some()
    }
}

/// A configured fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: FeeCategory,
    pub rate_basis: RateBasis,

    /// Rate for flat, pmpm, pepm, per-transaction and manual bases
    #[serde(default)]
    pub base_amount: f64,

    /// Percentage (0-100) for percent-of-premium/claims bases
    #[serde(default)]
    pub percentage: f64,

    #[serde(default)]
    pub tiering_enabled: bool,
    /// Ascending, non-overlapping enrollment brackets
    #[serde(default)]
    pub tiers: Vec<Tier>,

    /// Use enrollment for PMPM when member count is absent
    #[serde(default)]
    pub enrollment_fallback: bool,

    pub effective_start: NaiveDate,
    #[serde(default)]
    pub effective_end: Option<NaiveDate>,

    #[serde(default)]
    pub blended_components: Vec<BlendedComponent>,
    #[serde(default)]
    pub composite_rate: Option<CompositeRate>,

    #[serde(default)]
    pub seasonal_modifiers: Vec<SeasonalModifier>,
    #[serde(default)]
    pub escalation: Option<EscalationSchedule>,
    #[serde(default)]
    pub constraints: Option<RateConstraints>,
}

impl FeeDefinition {
    /// Create a fee with no rate configured yet
    pub fn new(id: &str, category: FeeCategory, rate_basis: RateBasis, effective_start: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            category,
            rate_basis,
            base_amount: 0.0,
            percentage: 0.0,
            tiering_enabled: false,
            tiers: Vec::new(),
            enrollment_fallback: false,
            effective_start,
            effective_end: None,
            blended_components: Vec::new(),
            composite_rate: None,
            seasonal_modifiers: Vec::new(),
            escalation: None,
            constraints: None,
        }
    }

    pub fn with_base_amount(mut self, amount: f64) -> Self {
        self.base_amount = amount;
        self
    }

    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.percentage = percentage;
        self
    }

    /// Enable tiering with the given brackets
    pub fn with_tiers(mut self, tiers: Vec<Tier>) -> Self {
        self.tiering_enabled = true;
        self.tiers = tiers;
        self
    }

    pub fn with_components(mut self, components: Vec<BlendedComponent>) -> Self {
        self.blended_components = components;
        self
    }

    pub fn with_composite_rate(mut self, member_rate: f64, dependent_rate: f64) -> Self {
        self.composite_rate = Some(CompositeRate {
            member_rate,
            dependent_rate,
        });
        self
    }

    pub fn with_enrollment_fallback(mut self) -> Self {
        self.enrollment_fallback = true;
        self
    }

    pub fn ending(mut self, effective_end: NaiveDate) -> Self {
        self.effective_end = Some(effective_end);
        self
    }

    /// First reporting period the fee applies to
    pub fn start_period(&self) -> Period {
        Period::from_date(self.effective_start)
    }

    /// Whether the fee's effective range covers the period (month granularity)
    pub fn is_active(&self, period: Period) -> bool {
        period >= self.start_period()
            && self
                .effective_end
                .map_or(true, |end| period <= Period::from_date(end))
    }
}

/// Period inputs a fee is resolved against
///
/// Every field is optional; a basis that needs an absent field fails with
/// `MissingContext` instead of substituting a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodContext {
    pub period: Period,
    pub enrollment: Option<u32>,
    pub employee_count: Option<u32>,
    pub member_count: Option<u32>,
    pub premium_total: Option<f64>,
    pub claims_total: Option<f64>,
    pub transaction_count: Option<u32>,
}

impl PeriodContext {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            enrollment: None,
            employee_count: None,
            member_count: None,
            premium_total: None,
            claims_total: None,
            transaction_count: None,
        }
    }

    /// Context for an experience period with the given claims base
    pub fn from_experience(record: &ExperienceRecord, claims_total: f64) -> Self {
        Self {
            period: record.period,
            enrollment: record.enrollment,
            employee_count: record.ee_count,
            member_count: record.member_count,
            premium_total: record.premiums,
            claims_total: Some(claims_total),
            transaction_count: record.transaction_count,
        }
    }

    pub fn with_enrollment(mut self, enrollment: u32) -> Self {
        self.enrollment = Some(enrollment);
        self
    }

    pub fn with_employees(mut self, employee_count: u32) -> Self {
        self.employee_count = Some(employee_count);
        self
    }

    pub fn with_members(mut self, member_count: u32) -> Self {
        self.member_count = Some(member_count);
        self
    }

    pub fn with_premiums(mut self, premium_total: f64) -> Self {
        self.premium_total = Some(premium_total);
        self
    }

    pub fn with_claims(mut self, claims_total: f64) -> Self {
        self.claims_total = Some(claims_total);
        self
    }

    pub fn with_transactions(mut self, transaction_count: u32) -> Self {
        self.transaction_count = Some(transaction_count);
        self
    }

    /// Same inputs for a different period
    pub fn for_period(&self, period: Period) -> Self {
        Self {
            period,
            ..self.clone()
        }
    }
}

/// Labelled amount of one blended component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentAmount {
    pub label: String,
    pub amount: f64,
}

/// How a resolved amount was built up
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub base_calculation: f64,
    pub seasonal_adjustment: f64,
    pub escalation_adjustment: f64,
    pub constraint_adjustment: f64,
    pub components: Vec<ComponentAmount>,
}

impl FeeBreakdown {
    pub fn total(&self) -> f64 {
        self.base_calculation + self.seasonal_adjustment + self.escalation_adjustment + self.constraint_adjustment
    }
}

/// A fee resolved for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFee {
    pub fee_id: String,
    pub period: Period,
    pub amount: f64,
    pub applied_tier: Option<Tier>,
    pub breakdown: FeeBreakdown,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_rate_basis_round_trips_wire_names() {
        for basis in RateBasis::ALL {
            assert_eq!(basis.as_str().parse::<RateBasis>().unwrap(), basis);
        }
        assert_eq!(
            "tiered".parse::<RateBasis>(),
            Err(CalcError::InvalidRateBasis("tiered".to_string()))
        );
    }

    #[test]
    fn test_unknown_basis_in_json_is_rejected() {
        let json = r#"{"id":"x","category":"administrative","rate_basis":"per_diem","effective_start":"2024-01-01"}"#;
        let err = serde_json::from_str::<FeeDefinition>(json).unwrap_err();
        assert!(err.to_string().contains("Invalid rate basis: per_diem"));
    }

    #[test]
    fn test_tier_contains() {
        let bounded = Tier::new(0, Some(1000), 5.0);
        assert!(bounded.contains(0));
        assert!(bounded.contains(1000));
        assert!(!bounded.contains(1001));

        let open = Tier::new(1001, None, 4.5);
        assert!(open.contains(1_000_000));
        assert!(!open.contains(1000));
    }

    #[test]
    fn test_effective_range_by_month() {
        let fee = FeeDefinition::new("tpa", FeeCategory::Administrative, RateBasis::Pepm, date("2024-01-15"))
            .ending(date("2024-06-30"));

        assert!(!fee.is_active(Period::parse("2023-12").unwrap()));
        assert!(fee.is_active(Period::parse("2024-01").unwrap()));
        assert!(fee.is_active(Period::parse("2024-06").unwrap()));
        assert!(!fee.is_active(Period::parse("2024-07").unwrap()));
    }
}
