use thiserror::Error;

use crate::config::ConfigError;

/// Validation and contract errors exposed by `shipquote-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("carrier id cannot be empty")]
    EmptyCarrierId,
    #[error("carrier id length {len} exceeds max {max}")]
    CarrierIdTooLong { len: usize, max: usize },
    #[error("carrier id contains invalid character '{ch}' at index {index}")]
    CarrierIdInvalidChar { ch: char, index: usize },

    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },
    #[error("invalid service level '{value}', expected one of ground, three_day, two_day, overnight")]
    InvalidServiceLevel { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("rate request must include at least one package")]
    NoPackages,
    #[error("rate request has {count} packages, max {max}")]
    TooManyPackages { count: usize, max: usize },
    #[error("package {index}: weight {value} must be greater than 0 and at most {max}")]
    WeightOutOfRange { index: usize, value: f64, max: f64 },
    #[error("package {index}: {dimension} {value} must be greater than 0 and at most {max}")]
    DimensionOutOfRange {
        index: usize,
        dimension: &'static str,
        value: f64,
        max: f64,
    },

    #[error("field '{field}' cannot be empty")]
    EmptyField { field: String },
    #[error("field '{field}' length {len} exceeds max {max}")]
    FieldTooLong { field: String, len: usize, max: usize },
    #[error("field '{field}' must be a 2-letter code: '{value}'")]
    InvalidRegionCode { field: String, value: String },
    #[error("field '{field}' must have between 1 and {max} street lines, got {count}")]
    StreetLineCount {
        field: String,
        count: usize,
        max: usize,
    },

    #[error("package spec must look like WEIGHT or WEIGHT:LxWxH: '{value}'")]
    InvalidPackageSpec { value: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("rate orchestrator requires at least one carrier")]
    NoCarriers,

    #[error("carrier '{0}' is registered more than once")]
    DuplicateCarrier(crate::CarrierId),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
