//! Error types for the calculation layer
//!
//! Calculators fail fast with a typed [`CalcError`]. The summary aggregator
//! never surfaces these to its caller; it converts them into warnings.

use thiserror::Error;

/// Errors raised by the lower-level calculators
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    /// Rate basis string did not match any supported basis, or a modifier was
    /// configured on a basis that cannot carry it
    #[error("Invalid rate basis: {0}")]
    InvalidRateBasis(String),

    /// A context field required by the fee's rate basis was absent
    #[error("Missing context field `{field}` required by {basis} fee `{fee_id}`")]
    MissingContext {
        fee_id: String,
        basis: &'static str,
        field: &'static str,
    },

    /// Divisor of a per-unit metric was zero
    #[error("{divisor} cannot be zero for {metric} calculation")]
    DivisionByZero {
        metric: &'static str,
        divisor: &'static str,
    },

    /// Premiums were zero for a loss ratio calculation
    #[error("Premiums cannot be zero for loss ratio calculation")]
    ZeroPremiums,

    /// Not enough history for a regression or windowed calculation
    #[error("Insufficient data for {operation} (minimum {required} periods required, {available} available)")]
    InsufficientData {
        operation: &'static str,
        required: usize,
        available: usize,
    },

    /// No data was supplied at all
    #[error("No data provided for {0}")]
    EmptyInput(&'static str),

    /// Month key could not be parsed
    #[error("Invalid period `{0}` (expected YYYY-MM)")]
    InvalidPeriod(String),

    /// Tier list is out of order or has overlapping brackets
    #[error("Invalid tiers for fee `{fee_id}`: {reason}")]
    InvalidTiers { fee_id: String, reason: String },

    /// Argument outside its valid domain (e.g. a zero-length window)
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Result alias used throughout the calculators
pub type CalcResult<T> = Result<T, CalcError>;
