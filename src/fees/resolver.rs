//! Fee resolution against a period's context
//!
//! Resolution runs in fixed steps:
//! 1. Base amount from the rate basis (with tiering for PMPM/PEPM)
//! 2. Seasonal modifier
//! 3. Escalation since the effective start
//! 4. Caps and floors
//!
//! Every step is a pure function of the definition and the context.

use super::tiers::TieredRateEngine;
use super::types::{
    BlendedComponent, ComponentAmount, ComponentKind, EscalationKind, FeeBreakdown, FeeDefinition,
    PeriodContext, RateBasis, RateConstraints, ResolvedFee, Tier,
};
use crate::error::{CalcError, CalcResult};
use crate::period::Period;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Base amount before modifiers
struct BaseCalculation {
    amount: f64,
    applied_tier: Option<Tier>,
    components: Vec<ComponentAmount>,
    warnings: Vec<String>,
}

impl BaseCalculation {
    fn plain(amount: f64) -> Self {
        Self {
            amount,
            applied_tier: None,
            components: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Resolve one fee for one period
pub fn resolve_fee(fee: &FeeDefinition, context: &PeriodContext) -> CalcResult<ResolvedFee> {
    if fee.tiering_enabled && !fee.rate_basis.supports_tiering() {
        return Err(CalcError::InvalidRateBasis(format!(
            "tiering is not supported for {} fee `{}`",
            fee.rate_basis, fee.id
        )));
    }

    let base = base_calculation(fee, context)?;

    let seasonal_adjustment = seasonal_adjustment(fee, base.amount, context.period);
    let escalation_adjustment = escalation_adjustment(fee, base.amount, context.period);
    let constraint_adjustment = match &fee.constraints {
        Some(constraints) => constraint_adjustment(
            fee,
            constraints,
            base.amount + seasonal_adjustment + escalation_adjustment,
            context,
        )?,
        None => 0.0,
    };

    let breakdown = FeeBreakdown {
        base_calculation: base.amount,
        seasonal_adjustment,
        escalation_adjustment,
        constraint_adjustment,
        components: base.components,
    };
    let amount = breakdown.total();

    debug!(
        "Resolved fee {} ({}) for {}: {:.2}",
        fee.id, fee.rate_basis, context.period, amount
    );

    Ok(ResolvedFee {
        fee_id: fee.id.clone(),
        period: context.period,
        amount,
        applied_tier: base.applied_tier,
        breakdown,
        warnings: base.warnings,
    })
}

/// Resolve one fee for several periods, keeping each period's outcome
pub fn resolve_many(fee: &FeeDefinition, contexts: &[PeriodContext]) -> Vec<CalcResult<ResolvedFee>> {
    contexts.iter().map(|context| resolve_fee(fee, context)).collect()
}

/// Twelve months of a fee resolved from a steady-state context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualFeeProjection {
    pub fee_id: String,
    pub total_projected: f64,
    pub by_period: Vec<(Period, f64)>,
}

/// Project a fee over the twelve months starting at `start`
pub fn project_annual_fees(
    fee: &FeeDefinition,
    template: &PeriodContext,
    start: Period,
) -> CalcResult<AnnualFeeProjection> {
    let by_period = (0..12)
        .map(|i| {
            let period = start.plus_months(i);
            let amount = if fee.is_active(period) {
                resolve_fee(fee, &template.for_period(period))?.amount
            } else {
                0.0
            };
            Ok((period, amount))
        })
        .collect::<CalcResult<Vec<_>>>()?;

    Ok(AnnualFeeProjection {
        fee_id: fee.id.clone(),
        total_projected: by_period.iter().map(|(_, amount)| amount).sum(),
        by_period,
    })
}

fn base_calculation(fee: &FeeDefinition, context: &PeriodContext) -> CalcResult<BaseCalculation> {
    let basis = fee.rate_basis;
    let base = match basis {
        RateBasis::Flat => BaseCalculation::plain(fee.base_amount),
        RateBasis::Pmpm if fee.tiering_enabled => {
            let enrollment = require(context.enrollment, fee, "enrollment")?;
            tiered(fee, enrollment, enrollment, context.period)
        }
        RateBasis::Pmpm => BaseCalculation::plain(fee.base_amount * member_units(fee, context)?),
        RateBasis::Pepm if fee.tiering_enabled => {
            let enrollment = require(context.enrollment, fee, "enrollment")?;
            let employees = require(context.employee_count, fee, "employee_count")?;
            tiered(fee, enrollment, employees, context.period)
        }
        RateBasis::Pepm => {
            let employees = require(context.employee_count, fee, "employee_count")?;
            BaseCalculation::plain(fee.base_amount * employees as f64)
        }
        RateBasis::PercentPremium => {
            let premiums = require(context.premium_total, fee, "premium_total")?;
            BaseCalculation::plain(premiums * fee.percentage / 100.0)
        }
        RateBasis::PercentClaims => {
            let claims = require(context.claims_total, fee, "claims_total")?;
            BaseCalculation::plain(claims * fee.percentage / 100.0)
        }
        RateBasis::PerTransaction => {
            let transactions = require(context.transaction_count, fee, "transaction_count")?;
            BaseCalculation::plain(fee.base_amount * transactions as f64)
        }
        RateBasis::Blended => {
            let components = fee
                .blended_components
                .iter()
                .map(|component| {
                    Ok(ComponentAmount {
                        label: component
                            .label
                            .clone()
                            .unwrap_or_else(|| component.kind.as_str().to_string()),
                        amount: component_amount(fee, component, context)?,
                    })
                })
                .collect::<CalcResult<Vec<_>>>()?;
            BaseCalculation {
                amount: components.iter().map(|c| c.amount).sum(),
                applied_tier: None,
                components,
                warnings: Vec::new(),
            }
        }
        RateBasis::Composite => {
            let rates = fee.composite_rate.ok_or_else(|| CalcError::InvalidParameter {
                name: "composite_rate",
                reason: format!("composite fee `{}` has no member/dependent rates", fee.id),
            })?;
            let members = require(context.member_count, fee, "member_count")?;
            let enrollment = require(context.enrollment, fee, "enrollment")?;
            let dependents = enrollment.saturating_sub(members);
            BaseCalculation::plain(rates.member_rate * members as f64 + rates.dependent_rate * dependents as f64)
        }
        RateBasis::Manual => {
            let mut base = BaseCalculation::plain(fee.base_amount);
            base.warnings
                .push("Manual fee type - amount not automatically calculated".to_string());
            base
        }
    };
    Ok(base)
}

fn tiered(fee: &FeeDefinition, enrollment: u32, units: u32, period: Period) -> BaseCalculation {
    let resolution = TieredRateEngine::new(&fee.tiers).resolve(enrollment, units);
    let mut base = BaseCalculation::plain(resolution.amount);
    match resolution.tier {
        Some(tier) => base.applied_tier = Some(tier.clone()),
        None => {
            let message = format!(
                "No tier of fee `{}` covers enrollment {}; amount set to 0",
                fee.id, enrollment
            );
            warn!("{} ({})", message, period);
            base.warnings.push(message);
        }
    }
    base
}

fn component_amount(fee: &FeeDefinition, component: &BlendedComponent, context: &PeriodContext) -> CalcResult<f64> {
    let amount = match component.kind {
        ComponentKind::Fixed => component.value,
        ComponentKind::Pmpm => component.value * member_units(fee, context)?,
        ComponentKind::PercentPremium => {
            require(context.premium_total, fee, "premium_total")? * component.value / 100.0
        }
        ComponentKind::PercentClaims => {
            require(context.claims_total, fee, "claims_total")? * component.value / 100.0
        }
    };
    Ok(amount)
}

/// Members billed per month: member count, or enrollment when the fee opts in
fn member_units(fee: &FeeDefinition, context: &PeriodContext) -> CalcResult<f64> {
    match (context.member_count, context.enrollment) {
        (Some(members), _) => Ok(members as f64),
        (None, Some(enrollment)) if fee.enrollment_fallback => Ok(enrollment as f64),
        _ => Err(missing(fee, "member_count")),
    }
}

fn require<T>(value: Option<T>, fee: &FeeDefinition, field: &'static str) -> CalcResult<T> {
    value.ok_or_else(|| missing(fee, field))
}

fn missing(fee: &FeeDefinition, field: &'static str) -> CalcError {
    CalcError::MissingContext {
        fee_id: fee.id.clone(),
        basis: fee.rate_basis.as_str(),
        field,
    }
}

fn seasonal_adjustment(fee: &FeeDefinition, base: f64, period: Period) -> f64 {
    fee.seasonal_modifiers
        .iter()
        .find(|modifier| modifier.months.contains(&period.month()))
        .map_or(0.0, |modifier| base * (modifier.multiplier - 1.0))
}

fn escalation_adjustment(fee: &FeeDefinition, base: f64, period: Period) -> f64 {
    let Some(schedule) = &fee.escalation else {
        return 0.0;
    };

    let elapsed = period.months_since(&fee.start_period());
    if elapsed <= 0 {
        return 0.0;
    }
    let steps = schedule.frequency.steps(elapsed as u32);
    if steps == 0 {
        return 0.0;
    }

    match schedule.kind {
        EscalationKind::Percentage => {
            let rate = schedule.value / 100.0;
            if schedule.compounding {
                base * ((1.0 + rate).powi(steps as i32) - 1.0)
            } else {
                base * rate * steps as f64
            }
        }
        EscalationKind::FixedAmount => schedule.value * steps as f64,
    }
}

fn constraint_adjustment(
    fee: &FeeDefinition,
    constraints: &RateConstraints,
    calculated: f64,
    context: &PeriodContext,
) -> CalcResult<f64> {
    let mut adjustment = 0.0;

    if let Some(min) = constraints.min_amount {
        if calculated < min {
            adjustment = min - calculated;
        }
    }
    if let Some(max) = constraints.max_amount {
        if calculated > max {
            adjustment = max - calculated;
        }
    }

    if constraints.uses_enrollment() {
        let enrollment = require(context.enrollment, fee, "enrollment")? as f64;

        if let Some(min_per_member) = constraints.min_per_member {
            let min_total = min_per_member * enrollment;
            if calculated < min_total {
                adjustment = f64::max(adjustment, min_total - calculated);
            }
        }
        if let Some(max_per_member) = constraints.max_per_member {
            let max_total = max_per_member * enrollment;
            if calculated > max_total {
                adjustment = f64::min(adjustment, max_total - calculated);
            }
        }
    }

    Ok(adjustment)
}
