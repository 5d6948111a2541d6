use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Postal address used as shipment origin or destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street_lines: Vec<String>,
    pub city: String,
    /// Two-letter state or province code.
    pub state: String,
    pub postal_code: String,
    /// Two-letter ISO country code.
    pub country: String,
}

impl Address {
    pub fn new(
        street_lines: Vec<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            street_lines,
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
            country: country.into(),
        }
    }

    fn normalized_postal_code(&self) -> String {
        self.postal_code
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase()
    }

    fn normalized_country(&self) -> String {
        self.country.trim().to_ascii_uppercase()
    }
}

/// Package dimensions. Units are agreed between caller and carrier adapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub weight: f64,
    pub dimensions: Option<Dimensions>,
}

impl Package {
    pub const fn new(weight: f64, dimensions: Option<Dimensions>) -> Self {
        Self { weight, dimensions }
    }

    fn dimension_signature(&self) -> String {
        match self.dimensions {
            Some(dims) => format!("{:.2}x{:.2}x{:.2}", dims.length, dims.width, dims.height),
            None => String::from("none"),
        }
    }
}

impl FromStr for Package {
    type Err = ValidationError;

    /// Parses `WEIGHT` or `WEIGHT:LxWxH`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidPackageSpec {
            value: value.to_owned(),
        };
        let parse_number = |raw: &str| raw.trim().parse::<f64>().map_err(|_| invalid());

        let (weight, dims) = match value.split_once(':') {
            Some((weight, dims)) => (weight, Some(dims)),
            None => (value, None),
        };
        let weight = parse_number(weight)?;

        let dimensions = match dims {
            Some(dims) => {
                let parts = dims
                    .split(['x', 'X'])
                    .map(parse_number)
                    .collect::<Result<Vec<_>, _>>()?;
                let [length, width, height] = parts[..] else {
                    return Err(invalid());
                };
                Some(Dimensions::new(length, width, height))
            }
            None => None,
        };

        Ok(Self::new(weight, dimensions))
    }
}

/// Requested service level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLevel {
    Ground,
    ThreeDay,
    TwoDay,
    Overnight,
}

impl ServiceLevel {
    pub const ALL: [Self; 4] = [Self::Ground, Self::ThreeDay, Self::TwoDay, Self::Overnight];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ground => "ground",
            Self::ThreeDay => "three_day",
            Self::TwoDay => "two_day",
            Self::Overnight => "overnight",
        }
    }
}

impl Display for ServiceLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceLevel {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ground" => Ok(Self::Ground),
            "three_day" | "3day" => Ok(Self::ThreeDay),
            "two_day" | "2day" => Ok(Self::TwoDay),
            "overnight" | "next_day" => Ok(Self::Overnight),
            other => Err(ValidationError::InvalidServiceLevel {
                value: other.to_owned(),
            }),
        }
    }
}

/// Immutable rate request consumed by the orchestrator and carriers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRequest {
    pub origin: Address,
    pub destination: Address,
    pub packages: Vec<Package>,
    pub service_level: Option<ServiceLevel>,
}

impl RateRequest {
    pub fn new(origin: Address, destination: Address, packages: Vec<Package>) -> Self {
        Self {
            origin,
            destination,
            packages,
            service_level: None,
        }
    }

    pub fn with_service_level(mut self, service_level: ServiceLevel) -> Self {
        self.service_level = Some(service_level);
        self
    }

    pub fn total_weight(&self) -> f64 {
        self.packages.iter().map(|package| package.weight).sum()
    }

    /// Deterministic cache key over the rate-relevant fields only.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut signatures = self
            .packages
            .iter()
            .map(Package::dimension_signature)
            .collect::<Vec<_>>();
        signatures.sort();

        let service = self
            .service_level
            .map(ServiceLevel::as_str)
            .unwrap_or("ALL");

        Fingerprint(format!(
            "{}:{}|{}:{}|{:.3}|{}|{}",
            self.origin.normalized_postal_code(),
            self.origin.normalized_country(),
            self.destination.normalized_postal_code(),
            self.destination.normalized_country(),
            self.total_weight(),
            signatures.join(","),
            service,
        ))
    }
}

/// Cache key derived from a [`RateRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(postal_code: &str, country: &str) -> Address {
        Address::new(
            vec![String::from("1 Main St")],
            "Springfield",
            "IL",
            postal_code,
            country,
        )
    }

    fn request(packages: Vec<Package>) -> RateRequest {
        RateRequest::new(address("62701", "US"), address("10001", "US"), packages)
    }

    #[test]
    fn fingerprint_ignores_package_order() {
        let small = Package::new(2.0, Some(Dimensions::new(5.0, 5.0, 5.0)));
        let large = Package::new(8.0, Some(Dimensions::new(20.0, 10.0, 10.0)));

        assert_eq!(
            request(vec![small, large]).fingerprint(),
            request(vec![large, small]).fingerprint()
        );
    }

    #[test]
    fn fingerprint_normalizes_postal_code_and_country() {
        let packages = vec![Package::new(1.0, None)];
        let plain = RateRequest::new(address("k1a 0b1", "ca"), address("10001", "us"), packages.clone());
        let shouted = RateRequest::new(address("K1A0B1", "CA"), address("10001", "US"), packages);

        assert_eq!(plain.fingerprint(), shouted.fingerprint());
    }

    #[test]
    fn fingerprint_ignores_street_and_city() {
        let packages = vec![Package::new(1.0, None)];
        let mut other_origin = address("62701", "US");
        other_origin.city = String::from("Chatham");
        other_origin.street_lines = vec![String::from("9 Elm St")];

        let baseline = request(packages.clone());
        let moved = RateRequest::new(other_origin, address("10001", "US"), packages);

        assert_eq!(baseline.fingerprint(), moved.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_service_level() {
        let all = request(vec![Package::new(1.0, None)]);
        let ground = all.clone().with_service_level(ServiceLevel::Ground);

        assert_ne!(all.fingerprint(), ground.fingerprint());
        assert!(all.fingerprint().as_str().ends_with("|ALL"));
        assert!(ground.fingerprint().as_str().ends_with("|ground"));
    }

    #[test]
    fn parses_package_specs() {
        let bare: Package = "5.5".parse().expect("weight only");
        assert_eq!(bare, Package::new(5.5, None));

        let boxed: Package = "10:12x8x6".parse().expect("weight and dims");
        assert_eq!(
            boxed,
            Package::new(10.0, Some(Dimensions::new(12.0, 8.0, 6.0)))
        );

        assert!(matches!(
            "10:12x8".parse::<Package>(),
            Err(ValidationError::InvalidPackageSpec { .. })
        ));
        assert!(matches!(
            "heavy".parse::<Package>(),
            Err(ValidationError::InvalidPackageSpec { .. })
        ));
    }

    #[test]
    fn parses_service_levels() {
        assert_eq!("Two-Day".parse::<ServiceLevel>(), Ok(ServiceLevel::TwoDay));
        assert_eq!("ground".parse::<ServiceLevel>(), Ok(ServiceLevel::Ground));
        assert!("teleport".parse::<ServiceLevel>().is_err());
    }
}
