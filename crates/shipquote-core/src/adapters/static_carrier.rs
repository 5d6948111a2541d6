use crate::carrier::{Carrier, RateFuture};
use crate::{CarrierId, RateQuote, RateRequest, ServiceLevel};

/// One rated service offered by a [`StaticCarrier`].
#[derive(Debug, Clone, PartialEq)]
pub struct StaticService {
    pub level: ServiceLevel,
    pub code: String,
    pub name: String,
    pub base: f64,
    pub per_weight_unit: f64,
    pub transit_days: Option<u32>,
}

impl StaticService {
    pub fn new(
        level: ServiceLevel,
        code: impl Into<String>,
        name: impl Into<String>,
        base: f64,
        per_weight_unit: f64,
        transit_days: Option<u32>,
    ) -> Self {
        Self {
            level,
            code: code.into(),
            name: name.into(),
            base,
            per_weight_unit,
            transit_days,
        }
    }
}

/// Deterministic in-memory carrier.
///
/// Prices are `base + per_weight_unit * total_weight`, rounded to cents.
/// Used for offline runs and tests; performs no I/O.
#[derive(Debug, Clone)]
pub struct StaticCarrier {
    id: CarrierId,
    currency: String,
    services: Vec<StaticService>,
}

impl StaticCarrier {
    pub fn new(id: CarrierId, currency: impl Into<String>, services: Vec<StaticService>) -> Self {
        Self {
            id,
            currency: currency.into(),
            services,
        }
    }

    /// Four-service rate card under the given id.
    pub fn demo(id: CarrierId) -> Self {
        Self::new(
            id,
            "USD",
            vec![
                StaticService::new(ServiceLevel::Ground, "GND", "Ground", 8.50, 0.45, Some(5)),
                StaticService::new(ServiceLevel::ThreeDay, "3DS", "Three Day Select", 14.00, 0.80, Some(3)),
                StaticService::new(ServiceLevel::TwoDay, "2DA", "Second Day Air", 21.75, 1.10, Some(2)),
                StaticService::new(ServiceLevel::Overnight, "NDA", "Next Day Air", 38.00, 1.95, Some(1)),
            ],
        )
    }

    fn quote(&self, service: &StaticService, total_weight: f64) -> Result<RateQuote, crate::ValidationError> {
        let amount = ((service.base + service.per_weight_unit * total_weight) * 100.0).round() / 100.0;
        RateQuote::new(
            self.id.clone(),
            service.code.clone(),
            service.name.clone(),
            amount,
            &self.currency,
            service.transit_days,
        )
    }
}

impl Carrier for StaticCarrier {
    fn id(&self) -> &CarrierId {
        &self.id
    }

    fn rates<'a>(&'a self, request: &'a RateRequest) -> RateFuture<'a> {
        Box::pin(async move {
            let total_weight = request.total_weight();
            let quotes = self
                .services
                .iter()
                .filter(|service| {
                    request
                        .service_level
                        .map_or(true, |level| level == service.level)
                })
                .map(|service| self.quote(service, total_weight))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(quotes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, Package};

    fn request(weights: &[f64]) -> RateRequest {
        let address = Address::new(vec![String::from("1 Main St")], "Austin", "TX", "73301", "US");
        RateRequest::new(
            address.clone(),
            address,
            weights.iter().map(|weight| Package::new(*weight, None)).collect(),
        )
    }

    fn carrier() -> StaticCarrier {
        StaticCarrier::demo(CarrierId::parse("offline").expect("valid carrier id"))
    }

    #[tokio::test]
    async fn prices_every_service_by_total_weight() {
        let quotes = carrier().rates(&request(&[4.0, 6.0])).await.expect("quotes");

        assert_eq!(quotes.len(), 4);
        assert_eq!(quotes[0].service_code, "GND");
        assert!((quotes[0].amount - 13.0).abs() < 1e-9);
        assert!(quotes.iter().all(|quote| quote.carrier.as_str() == "offline"));
    }

    #[tokio::test]
    async fn service_level_filters_rate_card() {
        let request = request(&[1.0]).with_service_level(ServiceLevel::Overnight);
        let quotes = carrier().rates(&request).await.expect("quotes");

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].service_name, "Next Day Air");
        assert_eq!(quotes[0].transit_days, Some(1));
    }
}
