use serde::{Deserialize, Serialize};

use crate::{CarrierId, ValidationError};

/// Carrier-agnostic shipping rate quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    pub carrier: CarrierId,
    pub service_code: String,
    pub service_name: String,
    pub amount: f64,
    pub currency: String,
    pub transit_days: Option<u32>,
}

impl RateQuote {
    pub fn new(
        carrier: CarrierId,
        service_code: impl Into<String>,
        service_name: impl Into<String>,
        amount: f64,
        currency: impl AsRef<str>,
        transit_days: Option<u32>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("amount", amount)?;

        let service_code = service_code.into();
        if service_code.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: String::from("service_code"),
            });
        }

        Ok(Self {
            carrier,
            service_code,
            service_name: service_name.into(),
            amount,
            currency: validate_currency_code(currency.as_ref())?,
            transit_days,
        })
    }
}

/// Validate and normalize currency to uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
