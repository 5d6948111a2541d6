//! Pre-flight request validation.
//!
//! The orchestrator runs a [`RequestValidator`] before consulting the cache or
//! contacting any carrier.

use crate::{Address, RateRequest, ValidationError};

pub const MAX_PACKAGES: usize = 200;
pub const MAX_PACKAGE_WEIGHT: f64 = 150.0;
pub const MAX_PACKAGE_DIMENSION: f64 = 108.0;
pub const MAX_STREET_LINES: usize = 3;
pub const MAX_STREET_LINE_LEN: usize = 100;
pub const MAX_CITY_LEN: usize = 50;
pub const MAX_POSTAL_CODE_LEN: usize = 10;

/// Checks a request against field and range constraints.
pub trait RequestValidator: Send + Sync {
    fn validate(&self, request: &RateRequest) -> Result<(), ValidationError>;
}

/// Bounds shared by every carrier.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRequestValidator;

impl RequestValidator for DefaultRequestValidator {
    fn validate(&self, request: &RateRequest) -> Result<(), ValidationError> {
        validate_address("origin", &request.origin)?;
        validate_address("destination", &request.destination)?;

        if request.packages.is_empty() {
            return Err(ValidationError::NoPackages);
        }
        if request.packages.len() > MAX_PACKAGES {
            return Err(ValidationError::TooManyPackages {
                count: request.packages.len(),
                max: MAX_PACKAGES,
            });
        }

        for (index, package) in request.packages.iter().enumerate() {
            if !in_range(package.weight, MAX_PACKAGE_WEIGHT) {
                return Err(ValidationError::WeightOutOfRange {
                    index,
                    value: package.weight,
                    max: MAX_PACKAGE_WEIGHT,
                });
            }

            if let Some(dims) = package.dimensions {
                for (dimension, value) in [
                    ("length", dims.length),
                    ("width", dims.width),
                    ("height", dims.height),
                ] {
                    if !in_range(value, MAX_PACKAGE_DIMENSION) {
                        return Err(ValidationError::DimensionOutOfRange {
                            index,
                            dimension,
                            value,
                            max: MAX_PACKAGE_DIMENSION,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

fn in_range(value: f64, max: f64) -> bool {
    value.is_finite() && value > 0.0 && value <= max
}

fn validate_address(prefix: &str, address: &Address) -> Result<(), ValidationError> {
    let count = address.street_lines.len();
    if count == 0 || count > MAX_STREET_LINES {
        return Err(ValidationError::StreetLineCount {
            field: format!("{prefix}.street_lines"),
            count,
            max: MAX_STREET_LINES,
        });
    }
    for (index, line) in address.street_lines.iter().enumerate() {
        validate_text(
            &format!("{prefix}.street_lines[{index}]"),
            line,
            MAX_STREET_LINE_LEN,
        )?;
    }

    validate_text(&format!("{prefix}.city"), &address.city, MAX_CITY_LEN)?;
    validate_text(
        &format!("{prefix}.postal_code"),
        &address.postal_code,
        MAX_POSTAL_CODE_LEN,
    )?;
    validate_region_code(&format!("{prefix}.state"), &address.state)?;
    validate_region_code(&format!("{prefix}.country"), &address.country)
}

fn validate_text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField {
            field: field.to_owned(),
        });
    }

    let len = trimmed.chars().count();
    if len > max {
        return Err(ValidationError::FieldTooLong {
            field: field.to_owned(),
            len,
            max,
        });
    }

    Ok(())
}

fn validate_region_code(field: &str, value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.len() != 2 || !trimmed.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidRegionCode {
            field: field.to_owned(),
            value: value.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dimensions, Package};

    fn address() -> Address {
        Address::new(
            vec![String::from("500 W 2nd St")],
            "Austin",
            "TX",
            "78701",
            "US",
        )
    }

    fn request(packages: Vec<Package>) -> RateRequest {
        RateRequest::new(address(), address(), packages)
    }

    #[test]
    fn accepts_boundary_values() {
        let package = Package::new(150.0, Some(Dimensions::new(108.0, 1.0, 0.5)));
        DefaultRequestValidator
            .validate(&request(vec![package]))
            .expect("request at the bounds is valid");
    }

    #[test]
    fn rejects_empty_and_oversized_package_lists() {
        let error = DefaultRequestValidator
            .validate(&request(Vec::new()))
            .expect_err("no packages");
        assert_eq!(error, ValidationError::NoPackages);

        let error = DefaultRequestValidator
            .validate(&request(vec![Package::new(1.0, None); 201]))
            .expect_err("too many packages");
        assert!(matches!(error, ValidationError::TooManyPackages { count: 201, .. }));
    }

    #[test]
    fn rejects_weight_outside_bounds() {
        for weight in [0.0, -1.0, 150.01, f64::NAN] {
            let error = DefaultRequestValidator
                .validate(&request(vec![Package::new(weight, None)]))
                .expect_err("weight out of range");
            assert!(matches!(error, ValidationError::WeightOutOfRange { index: 0, .. }));
        }
    }

    #[test]
    fn rejects_dimension_outside_bounds() {
        let packages = vec![
            Package::new(1.0, None),
            Package::new(1.0, Some(Dimensions::new(10.0, 109.0, 10.0))),
        ];
        let error = DefaultRequestValidator
            .validate(&request(packages))
            .expect_err("width too large");

        assert!(matches!(
            error,
            ValidationError::DimensionOutOfRange {
                index: 1,
                dimension: "width",
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_address_fields() {
        let mut req = request(vec![Package::new(1.0, None)]);
        req.destination.country = String::from("USA");
        let error = DefaultRequestValidator.validate(&req).expect_err("bad country");
        assert!(
            matches!(error, ValidationError::InvalidRegionCode { ref field, .. } if field == "destination.country")
        );

        let mut req = request(vec![Package::new(1.0, None)]);
        req.origin.city = String::from("   ");
        let error = DefaultRequestValidator.validate(&req).expect_err("blank city");
        assert_eq!(
            error,
            ValidationError::EmptyField {
                field: String::from("origin.city")
            }
        );

        let mut req = request(vec![Package::new(1.0, None)]);
        req.origin.street_lines = vec![String::from("a"); 4];
        let error = DefaultRequestValidator.validate(&req).expect_err("too many lines");
        assert!(matches!(error, ValidationError::StreetLineCount { count: 4, .. }));
    }
}
