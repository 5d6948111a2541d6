use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_CARRIER_ID_LEN: usize = 32;

/// Normalized carrier identifier used in quotes, errors and events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CarrierId(String);

impl CarrierId {
    /// Parse and normalize a carrier id to lowercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCarrierId);
        }

        let normalized = trimmed.to_ascii_lowercase();
        let len = normalized.chars().count();
        if len > MAX_CARRIER_ID_LEN {
            return Err(ValidationError::CarrierIdTooLong {
                len,
                max: MAX_CARRIER_ID_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || ch == '_' || ch == '-';
            if !valid {
                return Err(ValidationError::CarrierIdInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CarrierId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CarrierId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for CarrierId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CarrierId> for String {
    fn from(value: CarrierId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_carrier_id() {
        let parsed = CarrierId::parse(" UPS ").expect("carrier id should parse");
        assert_eq!(parsed.as_str(), "ups");
    }

    #[test]
    fn rejects_invalid_chars() {
        let err = CarrierId::parse("fed ex").expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::CarrierIdInvalidChar { ch: ' ', index: 3 }
        ));
    }

    #[test]
    fn rejects_overlong_ids() {
        let err = CarrierId::parse(&"x".repeat(33)).expect_err("must fail");
        assert!(matches!(err, ValidationError::CarrierIdTooLong { len: 33, .. }));
    }
}
