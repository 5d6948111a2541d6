use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::carrier::{Carrier, RateFuture};
use crate::config::UpsSettings;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};
use crate::observability::SharedEventSink;
use crate::token::{Credential, CredentialFetcher, CredentialFuture, TokenManager, TokenManagerConfig};
use crate::{CarrierError, CarrierId, Package, RateQuote, RateRequest, ServiceLevel};

const TOKEN_PATH: &str = "/security/v1/oauth/token";
const RATING_PATH: &str = "/api/rating/v2403";
const TRANSACTION_SRC: &str = "shipquote";

/// OAuth client-credentials fetcher for the UPS security endpoint.
pub struct UpsCredentialFetcher {
    http_client: Arc<dyn HttpClient>,
    token_url: String,
    auth: HttpAuth,
    timeout: Duration,
}

impl UpsCredentialFetcher {
    pub fn new(settings: &UpsSettings, http_client: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self {
            http_client,
            token_url: format!("{}{TOKEN_PATH}", settings.base_url),
            auth: HttpAuth::Basic {
                username: settings.client_id.clone(),
                password: settings.client_secret.clone(),
            },
            timeout,
        }
    }
}

impl CredentialFetcher for UpsCredentialFetcher {
    fn fetch(&self) -> CredentialFuture<'_> {
        Box::pin(async move {
            let request = HttpRequest::post(&self.token_url)
                .with_auth(&self.auth)
                .with_form_body("grant_type=client_credentials")
                .with_timeout(self.timeout);

            let response = self
                .http_client
                .execute(request)
                .await?
                .error_for_status()?;

            let payload: OAuthTokenResponse = serde_json::from_str(&response.body).map_err(|e| {
                CarrierError::invalid_response(format!("failed to parse ups token response: {e}"))
                    .with_cause(e)
            })?;

            let lifetime = payload.expires_in.seconds().ok_or_else(|| {
                CarrierError::invalid_response("ups token response has a malformed expires_in")
            })?;

            Ok(Credential::new(payload.access_token, Duration::from_secs(lifetime)))
        })
    }
}

/// Rating adapter for the UPS REST API.
///
/// Bearer tokens come from a [`TokenManager`]. A 401 from the rating endpoint
/// drops the cached token and replays the call exactly once with a fresh one.
pub struct UpsCarrier {
    id: CarrierId,
    http_client: Arc<dyn HttpClient>,
    tokens: TokenManager,
    rating_url: String,
    account_number: Option<String>,
    timeout: Duration,
}

impl UpsCarrier {
    pub fn new(
        settings: &UpsSettings,
        http_client: Arc<dyn HttpClient>,
        token_config: TokenManagerConfig,
        timeout: Duration,
    ) -> Self {
        let fetcher = UpsCredentialFetcher::new(settings, Arc::clone(&http_client), timeout);
        Self {
            id: ups_carrier_id(),
            tokens: TokenManager::new("ups", Arc::new(fetcher), token_config),
            http_client,
            rating_url: format!("{}{RATING_PATH}", settings.base_url),
            account_number: settings.account_number.clone(),
            timeout,
        }
    }

    pub fn with_event_sink(mut self, sink: SharedEventSink) -> Self {
        self.tokens = self.tokens.with_event_sink(sink);
        self
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    async fn call_with_token_refresh(&self, url: &str, body: &str) -> Result<HttpResponse, CarrierError> {
        let token = self.tokens.token().await?;
        let response = self.post(url, body, token).await?;
        if !matches!(response.status, 401 | 403) {
            return response.error_for_status();
        }

        debug!(carrier = %self.id, "bearer token rejected; refreshing once");
        self.tokens.clear_cache();
        let token = self.tokens.token().await?;
        self.post(url, body, token).await?.error_for_status()
    }

    async fn post(&self, url: &str, body: &str, token: String) -> Result<HttpResponse, CarrierError> {
        let request = HttpRequest::post(url)
            .with_auth(&HttpAuth::Bearer(token))
            .with_header("transId", format!("{:016x}", fastrand::u64(..)))
            .with_header("transactionSrc", TRANSACTION_SRC)
            .with_json_body(body)
            .with_timeout(self.timeout);

        Ok(self.http_client.execute(request).await?)
    }
}

impl Carrier for UpsCarrier {
    fn id(&self) -> &CarrierId {
        &self.id
    }

    fn rates<'a>(&'a self, request: &'a RateRequest) -> RateFuture<'a> {
        Box::pin(async move {
            let payload = build_rate_payload(request, self.account_number.as_deref());
            let body = serde_json::to_string(&payload).map_err(|e| {
                CarrierError::invalid_request(format!("failed to encode ups rate request: {e}"))
                    .with_cause(e)
            })?;

            let option = payload.rate_request.request.request_option;
            let url = format!("{}/{option}", self.rating_url);

            let response = self.call_with_token_refresh(&url, &body).await?;
            normalize_rate_response(&self.id, &response.body)
        })
    }
}

pub fn ups_carrier_id() -> CarrierId {
    CarrierId::parse("ups").expect("literal carrier id is valid")
}

/// UPS service code for a service level.
pub const fn service_code(level: ServiceLevel) -> &'static str {
    match level {
        ServiceLevel::Overnight => "01",
        ServiceLevel::TwoDay => "02",
        ServiceLevel::Ground => "03",
        ServiceLevel::ThreeDay => "12",
    }
}

pub fn service_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "01" => "UPS Next Day Air",
        "02" => "UPS 2nd Day Air",
        "03" => "UPS Ground",
        "12" => "UPS 3 Day Select",
        "13" => "UPS Next Day Air Saver",
        "14" => "UPS Next Day Air Early",
        "59" => "UPS 2nd Day Air A.M.",
        _ => return None,
    };
    Some(name)
}

pub fn service_level(code: &str) -> Option<ServiceLevel> {
    match code {
        "01" | "13" | "14" => Some(ServiceLevel::Overnight),
        "02" | "59" => Some(ServiceLevel::TwoDay),
        "12" => Some(ServiceLevel::ThreeDay),
        "03" => Some(ServiceLevel::Ground),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: ExpiresIn,
}

/// UPS sends `expires_in` as a quoted number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
    Seconds(u64),
    Text(String),
}

impl ExpiresIn {
    fn seconds(&self) -> Option<u64> {
        match self {
            Self::Seconds(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RatePayload {
    #[serde(rename = "RateRequest")]
    rate_request: RateRequestBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RateRequestBody {
    request: RequestHeader,
    shipment: Shipment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RequestHeader {
    request_option: &'static str,
    transaction_reference: TransactionReference,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TransactionReference {
    customer_context: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Shipment {
    shipper: Party,
    ship_to: Party,
    ship_from: Party,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<CodeValue>,
    package: Vec<UpsPackage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shipment_rating_options: Option<RatingOptions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Party {
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    shipper_number: Option<String>,
    address: UpsAddress,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpsAddress {
    address_line: Vec<String>,
    city: String,
    state_province_code: String,
    postal_code: String,
    country_code: String,
}

impl From<&crate::Address> for UpsAddress {
    fn from(address: &crate::Address) -> Self {
        Self {
            address_line: address.street_lines.clone(),
            city: address.city.trim().to_owned(),
            state_province_code: address.state.trim().to_ascii_uppercase(),
            postal_code: address.postal_code.trim().to_owned(),
            country_code: address.country.trim().to_ascii_uppercase(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CodeValue {
    code: String,
}

impl CodeValue {
    fn new(code: &str) -> Self {
        Self {
            code: code.to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpsPackage {
    packaging_type: CodeValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<UpsDimensions>,
    package_weight: UpsWeight,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpsDimensions {
    unit_of_measurement: CodeValue,
    length: String,
    width: String,
    height: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpsWeight {
    unit_of_measurement: CodeValue,
    weight: String,
}

impl From<&Package> for UpsPackage {
    fn from(package: &Package) -> Self {
        Self {
            packaging_type: CodeValue::new("02"),
            dimensions: package.dimensions.map(|dims| UpsDimensions {
                unit_of_measurement: CodeValue::new("IN"),
                length: decimal(dims.length),
                width: decimal(dims.width),
                height: decimal(dims.height),
            }),
            package_weight: UpsWeight {
                unit_of_measurement: CodeValue::new("LBS"),
                weight: decimal(package.weight),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RatingOptions {
    negotiated_rates_indicator: &'static str,
}

fn decimal(value: f64) -> String {
    format!("{value:.2}")
}

fn build_rate_payload(request: &RateRequest, account_number: Option<&str>) -> RatePayload {
    let shipper_address = UpsAddress::from(&request.origin);
    let ship_from_address = UpsAddress::from(&request.origin);

    RatePayload {
        rate_request: RateRequestBody {
            request: RequestHeader {
                request_option: if request.service_level.is_some() {
                    "Rate"
                } else {
                    "Shop"
                },
                transaction_reference: TransactionReference {
                    customer_context: TRANSACTION_SRC,
                },
            },
            shipment: Shipment {
                shipper: Party {
                    name: "Shipper",
                    shipper_number: account_number.map(str::to_owned),
                    address: shipper_address,
                },
                ship_to: Party {
                    name: "Recipient",
                    shipper_number: None,
                    address: UpsAddress::from(&request.destination),
                },
                ship_from: Party {
                    name: "Shipper",
                    shipper_number: None,
                    address: ship_from_address,
                },
                service: request
                    .service_level
                    .map(|level| CodeValue::new(service_code(level))),
                package: request.packages.iter().map(UpsPackage::from).collect(),
                shipment_rating_options: account_number.map(|_| RatingOptions {
                    negotiated_rates_indicator: "Y",
                }),
            },
        },
    }
}

#[derive(Debug, Deserialize)]
struct RateResponseEnvelope {
    #[serde(rename = "RateResponse")]
    rate_response: RateResponseBody,
}

#[derive(Debug, Deserialize)]
struct RateResponseBody {
    #[serde(rename = "RatedShipment", default)]
    rated_shipment: Option<OneOrMany<RatedShipment>>,
}

/// UPS returns a bare object when a single service is rated and an array otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RatedShipment {
    service: CodeValue,
    total_charges: Charge,
    #[serde(default)]
    negotiated_rate_charges: Option<NegotiatedCharges>,
    #[serde(default)]
    guaranteed_delivery: Option<GuaranteedDelivery>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Charge {
    currency_code: String,
    monetary_value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NegotiatedCharges {
    total_charge: Charge,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GuaranteedDelivery {
    #[serde(default)]
    business_days_in_transit: Option<String>,
}

fn normalize_rate_response(carrier: &CarrierId, body: &str) -> Result<Vec<RateQuote>, CarrierError> {
    let envelope: RateResponseEnvelope = serde_json::from_str(body).map_err(|e| {
        CarrierError::invalid_response(format!("failed to parse ups rate response: {e}"))
            .with_cause(e)
    })?;

    envelope
        .rate_response
        .rated_shipment
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(|shipment| normalize_shipment(carrier, shipment))
        .collect()
}

fn normalize_shipment(carrier: &CarrierId, shipment: RatedShipment) -> Result<RateQuote, CarrierError> {
    let code = shipment.service.code;
    let charge = shipment
        .negotiated_rate_charges
        .map(|negotiated| negotiated.total_charge)
        .unwrap_or(shipment.total_charges);

    let amount = charge.monetary_value.trim().parse::<f64>().map_err(|_| {
        CarrierError::invalid_response(format!(
            "ups service {code} has a non-numeric charge '{}'",
            charge.monetary_value
        ))
    })?;
    let transit_days = shipment
        .guaranteed_delivery
        .and_then(|delivery| delivery.business_days_in_transit)
        .and_then(|days| days.trim().parse::<u32>().ok());
    let name = service_name(&code)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("UPS Service {code}"));

    RateQuote::new(
        carrier.clone(),
        code,
        name,
        amount,
        charge.currency_code.trim(),
        transit_days,
    )
    .map_err(|error| CarrierError::invalid_response(error.to_string()).with_cause(error))
}
