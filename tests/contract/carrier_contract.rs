use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shipquote_core::adapters::ups_carrier_id;
use shipquote_core::{
    Address, Carrier, CarrierErrorKind, CarrierId, CarrierPolicy, CircuitBreakerConfig,
    CircuitState, Dimensions, HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse,
    Package, RateLimitedCarrier, RateRequest, ResilientCarrier, RetryConfig, ServiceLevel,
    StaticCarrier, TokenManagerConfig, UpsCarrier, UpsSettings,
};

const UPS_TOKEN: &str =
    r#"{"token_type":"Bearer","access_token":"contract-token","expires_in":14399}"#;

const UPS_SHOP: &str = r#"{
    "RateResponse": {
        "RatedShipment": [
            {
                "Service": {"Code": "03"},
                "TotalCharges": {"CurrencyCode": "USD", "MonetaryValue": "12.40"},
                "GuaranteedDelivery": {"BusinessDaysInTransit": "5"}
            },
            {
                "Service": {"Code": "02"},
                "TotalCharges": {"CurrencyCode": "USD", "MonetaryValue": "27.95"}
            },
            {
                "Service": {"Code": "01"},
                "TotalCharges": {"CurrencyCode": "USD", "MonetaryValue": "55.10"}
            }
        ]
    }
}"#;

/// Plays back canned responses in order; unscripted calls fail with a transport error.
#[derive(Default)]
struct ScriptedHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().expect("request log").len()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        self.requests.lock().expect("request log").push(request);
        let response = self
            .responses
            .lock()
            .expect("response script")
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::connect("no scripted response")));
        Box::pin(async move { response })
    }
}

fn ups_settings() -> UpsSettings {
    UpsSettings {
        client_id: String::from("contract-client"),
        client_secret: String::from("contract-secret"),
        account_number: None,
        base_url: String::from("https://ups.contract.test"),
    }
}

fn ups_carrier(http: Arc<ScriptedHttpClient>) -> UpsCarrier {
    UpsCarrier::new(
        &ups_settings(),
        http,
        TokenManagerConfig {
            refresh_buffer: Duration::from_secs(60),
            retry: RetryConfig::no_retry(),
        },
        Duration::from_secs(5),
    )
}

fn decorated(inner: Arc<dyn Carrier>, policy: CarrierPolicy) -> ResilientCarrier {
    let limited = RateLimitedCarrier::new(inner, policy.rate_limit_config());
    ResilientCarrier::new(Arc::new(limited), policy.retry_config(), policy.circuit)
}

struct CarrierCase {
    name: &'static str,
    carrier: Arc<dyn Carrier>,
    expected_id: CarrierId,
}

fn carrier_cases() -> Vec<CarrierCase> {
    let offline = CarrierId::parse("offline").expect("valid carrier id");
    let ups_http = ScriptedHttpClient::new(vec![
        Ok(HttpResponse::ok_json(UPS_TOKEN)),
        Ok(HttpResponse::ok_json(UPS_SHOP)),
    ]);
    let decorated_ups_http = ScriptedHttpClient::new(vec![
        Ok(HttpResponse::ok_json(UPS_TOKEN)),
        Ok(HttpResponse::ok_json(UPS_SHOP)),
    ]);

    vec![
        CarrierCase {
            name: "static",
            carrier: Arc::new(StaticCarrier::demo(offline.clone())),
            expected_id: offline.clone(),
        },
        CarrierCase {
            name: "decorated static",
            carrier: Arc::new(decorated(
                Arc::new(StaticCarrier::demo(offline.clone())),
                CarrierPolicy::default(),
            )),
            expected_id: offline,
        },
        CarrierCase {
            name: "ups",
            carrier: Arc::new(ups_carrier(ups_http)),
            expected_id: ups_carrier_id(),
        },
        CarrierCase {
            name: "decorated ups",
            carrier: Arc::new(decorated(
                Arc::new(ups_carrier(decorated_ups_http)),
                CarrierPolicy::ups_default(),
            )),
            expected_id: ups_carrier_id(),
        },
    ]
}

fn request() -> RateRequest {
    RateRequest::new(
        Address::new(vec![String::from("500 W 2nd St")], "Austin", "TX", "78701", "US"),
        Address::new(vec![String::from("1437 Bannock St")], "Denver", "CO", "80202", "US"),
        vec![
            Package::new(4.0, Some(Dimensions::new(12.0, 9.0, 6.0))),
            Package::new(2.5, None),
        ],
    )
}

#[tokio::test]
async fn rates_return_normalized_quotes_for_all_carriers() {
    let request = request();

    for case in carrier_cases() {
        assert_eq!(
            case.carrier.id(),
            &case.expected_id,
            "carrier '{}': id",
            case.name
        );

        let quotes = case
            .carrier
            .rates(&request)
            .await
            .unwrap_or_else(|error| panic!("carrier '{}' rates failed: {error}", case.name));
        assert!(!quotes.is_empty(), "carrier '{}': quotes present", case.name);

        for quote in &quotes {
            assert_eq!(
                quote.carrier, case.expected_id,
                "carrier '{}': quote attribution",
                case.name
            );
            assert!(
                quote.amount >= 0.0,
                "carrier '{}': amount must be non-negative",
                case.name
            );
            assert_eq!(quote.currency, "USD", "carrier '{}': currency", case.name);
            assert!(
                !quote.service_code.is_empty() && !quote.service_name.is_empty(),
                "carrier '{}': service identity",
                case.name
            );
        }
    }
}

#[tokio::test]
async fn static_carrier_honors_service_filter_through_decorators() {
    let id = CarrierId::parse("offline").expect("valid carrier id");
    let carrier = decorated(Arc::new(StaticCarrier::demo(id)), CarrierPolicy::unthrottled());

    let quotes = carrier
        .rates(&request().with_service_level(ServiceLevel::TwoDay))
        .await
        .expect("filtered quotes");

    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].service_code, "2DA");
    assert_eq!(quotes[0].transit_days, Some(2));
}

#[tokio::test]
async fn static_carrier_prices_are_deterministic() {
    let id = CarrierId::parse("offline").expect("valid carrier id");
    let carrier = StaticCarrier::demo(id);

    let first = carrier.rates(&request()).await.expect("first");
    let second = carrier.rates(&request()).await.expect("second");

    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn decorated_ups_retries_transient_upstream_failures() {
    let http = ScriptedHttpClient::new(vec![
        Ok(HttpResponse::ok_json(UPS_TOKEN)),
        Ok(HttpResponse::new(503, "service unavailable")),
        Ok(HttpResponse::ok_json(UPS_SHOP)),
    ]);
    let carrier = decorated(Arc::new(ups_carrier(http.clone())), CarrierPolicy::ups_default());

    let quotes = carrier.rates(&request()).await.expect("second attempt succeeds");

    assert_eq!(quotes.len(), 3);
    // token, failed rating, successful rating; the cached token is reused
    assert_eq!(http.request_count(), 3);
    assert_eq!(carrier.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn decorated_ups_errors_are_attributed_to_the_carrier() {
    let http = ScriptedHttpClient::new(vec![
        Ok(HttpResponse::ok_json(UPS_TOKEN)),
        Ok(HttpResponse::new(400, r#"{"response":{"errors":[{"message":"bad postal"}]}}"#)),
    ]);
    let carrier = ResilientCarrier::new(
        Arc::new(ups_carrier(http.clone())),
        RetryConfig::fixed(Duration::from_millis(10), 3),
        CircuitBreakerConfig::default(),
    );

    let error = carrier.rates(&request()).await.expect_err("bad request");

    assert_eq!(error.kind(), CarrierErrorKind::InvalidRequest);
    assert_eq!(error.carrier(), Some(&ups_carrier_id()));
    assert!(!error.retryable());
    // non-retryable: token plus one rating call
    assert_eq!(http.request_count(), 2);
}
