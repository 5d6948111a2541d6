use std::sync::Arc;

use serde::Serialize;
use shipquote_core::{
    CarrierId, CarrierPolicy, HttpClient, RateOrchestrator, RateQuote, RateResponse,
    ReqwestHttpClient, SharedEventSink, ShipquoteConfig, StaticCarrier, TokenManagerConfig,
    TracingEventSink, UpsCarrier,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cli::RatesArgs;
use crate::error::CliError;

use super::CommandResult;

const OFFLINE_CARRIER_ID: &str = "offline";

#[derive(Debug, Serialize)]
struct RatesDocument {
    request_id: String,
    quotes: Vec<RateQuote>,
    failures: Vec<FailureDocument>,
    cache_hit: bool,
    latency_ms: u64,
}

#[derive(Debug, Serialize)]
struct FailureDocument {
    carrier: CarrierId,
    code: &'static str,
    message: String,
    retryable: bool,
}

pub async fn run(args: &RatesArgs, request_id: Uuid) -> Result<CommandResult, CliError> {
    let config = ShipquoteConfig::from_env()?;
    let orchestrator = build_orchestrator(args, &config)?;
    let request = args.to_request();

    let response = orchestrator.rates_detailed(&request).await?;
    info!(
        quotes = response.quotes.len(),
        failures = response.failures.len(),
        cache_hit = response.cache_hit,
        latency_ms = response.latency_ms,
        "rates complete"
    );

    let partial = response.is_partial();
    let document = serde_json::to_value(to_document(request_id, response))?;
    Ok(CommandResult { document, partial })
}

fn build_orchestrator(
    args: &RatesArgs,
    config: &ShipquoteConfig,
) -> Result<RateOrchestrator, CliError> {
    let sink: SharedEventSink = Arc::new(TracingEventSink);
    let builder = RateOrchestrator::builder()
        .with_cache_ttl(config.cache_ttl)
        .with_event_sink(Arc::clone(&sink));

    let builder = if args.offline {
        let carrier = StaticCarrier::demo(CarrierId::parse(OFFLINE_CARRIER_ID)?);
        builder.with_carrier(Arc::new(carrier), CarrierPolicy::unthrottled())
    } else {
        let settings = config.require_ups()?;
        if settings.account_number.is_none() {
            warn!("SHIPQUOTE_UPS_ACCOUNT_NUMBER is not set; negotiated rates are unavailable");
        }

        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let token_config = TokenManagerConfig {
            refresh_buffer: config.token_refresh_buffer,
            ..TokenManagerConfig::default()
        };
        let ups = UpsCarrier::new(settings, http_client, token_config, config.http_timeout)
            .with_event_sink(sink);
        builder.with_carrier(Arc::new(ups), CarrierPolicy::ups_default())
    };

    Ok(builder.build()?)
}

fn to_document(request_id: Uuid, response: RateResponse) -> RatesDocument {
    let failures = response
        .failures
        .into_iter()
        .map(|failure| FailureDocument {
            carrier: failure.carrier,
            code: failure.error.code(),
            message: failure.error.message().to_owned(),
            retryable: failure.error.retryable(),
        })
        .collect();

    RatesDocument {
        request_id: request_id.to_string(),
        quotes: response.quotes,
        failures,
        cache_hit: response.cache_hit,
        latency_ms: response.latency_ms,
    }
}
