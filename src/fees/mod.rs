//! Fee definitions and per-period fee resolution

pub mod loader;
pub mod resolver;
pub mod tiers;
mod types;

pub use loader::{load_fee_definitions, load_fee_definitions_from_reader};
pub use resolver::{project_annual_fees, resolve_fee, resolve_many, AnnualFeeProjection};
pub use tiers::{validate_tiers, TierResolution, TieredRateEngine};
pub use types::{
    BlendedComponent, ComponentAmount, ComponentKind, CompositeRate, EscalationFrequency,
    EscalationKind, EscalationSchedule, FeeBreakdown, FeeCategory, FeeDefinition, PeriodContext,
    RateBasis, RateConstraints, ResolvedFee, SeasonalModifier, Tier,
};
