use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use crate::cache::CacheStore;
use crate::carrier::Carrier;
use crate::observability::{default_sink, ResilienceEvent, SharedEventSink};
use crate::policy::CarrierPolicy;
use crate::rate_limit::RateLimitedCarrier;
use crate::resilient::ResilientCarrier;
use crate::validation::{DefaultRequestValidator, RequestValidator};
use crate::{CarrierError, CarrierId, CoreError, RateQuote, RateRequest};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// One carrier omitted from an aggregate.
#[derive(Debug, Clone)]
pub struct CarrierFailure {
    pub carrier: CarrierId,
    pub error: CarrierError,
}

/// Aggregate result with per-carrier diagnostics.
#[derive(Debug, Clone)]
pub struct RateResponse {
    /// Quotes from every successful carrier, in registration order.
    pub quotes: Vec<RateQuote>,
    pub failures: Vec<CarrierFailure>,
    pub cache_hit: bool,
    pub latency_ms: u64,
}

impl RateResponse {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Fans a request out to every registered carrier and caches the aggregate.
pub struct RateOrchestrator {
    carriers: Vec<Arc<dyn Carrier>>,
    validator: Arc<dyn RequestValidator>,
    cache: CacheStore<Vec<RateQuote>>,
    sink: SharedEventSink,
}

enum Registration {
    Decorated(Arc<dyn Carrier>, CarrierPolicy),
    AsIs(Arc<dyn Carrier>),
}

/// Builder for [`RateOrchestrator`].
///
/// Carriers registered through [`with_carrier`](Self::with_carrier) are
/// wrapped as `ResilientCarrier(RateLimitedCarrier(carrier))` using the given
/// policy. Wrapping happens in [`build`](Self::build), so the event sink applies
/// regardless of call order.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use shipquote_core::{CarrierPolicy, RateOrchestratorBuilder, StaticCarrier};
///
/// let orchestrator = RateOrchestratorBuilder::new()
///     .with_carrier(Arc::new(StaticCarrier::demo()), CarrierPolicy::unthrottled())
///     .build()?;
/// ```
pub struct RateOrchestratorBuilder {
    registrations: Vec<Registration>,
    cache_ttl: Duration,
    validator: Arc<dyn RequestValidator>,
    sink: SharedEventSink,
}

impl Default for RateOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            cache_ttl: DEFAULT_CACHE_TTL,
            validator: Arc::new(DefaultRequestValidator),
            sink: default_sink(),
        }
    }

    /// Registers a raw carrier, decorated per `policy`.
    pub fn with_carrier(mut self, carrier: Arc<dyn Carrier>, policy: CarrierPolicy) -> Self {
        self.registrations
            .push(Registration::Decorated(carrier, policy));
        self
    }

    /// Registers a carrier exactly as given, with no decorators added.
    pub fn with_prebuilt_carrier(mut self, carrier: Arc<dyn Carrier>) -> Self {
        self.registrations.push(Registration::AsIs(carrier));
        self
    }

    /// `Duration::ZERO` disables caching.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn RequestValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_event_sink(mut self, sink: SharedEventSink) -> Self {
        self.sink = sink;
        self
    }

    /// # Errors
    ///
    /// [`CoreError::NoCarriers`] when nothing was registered and
    /// [`CoreError::DuplicateCarrier`] when two carriers share an id.
    pub fn build(self) -> Result<RateOrchestrator, CoreError> {
        if self.registrations.is_empty() {
            return Err(CoreError::NoCarriers);
        }

        let mut seen = HashSet::new();
        let mut carriers = Vec::with_capacity(self.registrations.len());
        for registration in self.registrations {
            let carrier = match registration {
                Registration::Decorated(raw, policy) => decorate(raw, &policy, &self.sink),
                Registration::AsIs(carrier) => carrier,
            };
            if !seen.insert(carrier.id().clone()) {
                return Err(CoreError::DuplicateCarrier(carrier.id().clone()));
            }
            carriers.push(carrier);
        }

        Ok(RateOrchestrator {
            carriers,
            validator: self.validator,
            cache: CacheStore::new(self.cache_ttl),
            sink: self.sink,
        })
    }
}

fn decorate(
    raw: Arc<dyn Carrier>,
    policy: &CarrierPolicy,
    sink: &SharedEventSink,
) -> Arc<dyn Carrier> {
    let limited = RateLimitedCarrier::new(raw, policy.rate_limit_config())
        .with_event_sink(Arc::clone(sink));
    Arc::new(
        ResilientCarrier::new(Arc::new(limited), policy.retry_config(), policy.circuit)
            .with_event_sink(Arc::clone(sink)),
    )
}

impl RateOrchestrator {
    pub fn builder() -> RateOrchestratorBuilder {
        RateOrchestratorBuilder::new()
    }

    /// Registered carrier ids in registration order.
    pub fn carrier_ids(&self) -> Vec<CarrierId> {
        self.carriers
            .iter()
            .map(|carrier| carrier.id().clone())
            .collect()
    }

    /// Aggregated quotes from every carrier that answered.
    ///
    /// # Errors
    ///
    /// Only validation failures are returned as errors; carrier failures are
    /// reported through the event sink and leave the quote list shorter.
    pub async fn get_rates(&self, request: &RateRequest) -> Result<Vec<RateQuote>, CarrierError> {
        self.rates_detailed(request)
            .await
            .map(|response| response.quotes)
    }

    /// Like [`get_rates`](Self::get_rates) but also returns the failures.
    pub async fn rates_detailed(&self, request: &RateRequest) -> Result<RateResponse, CarrierError> {
        let started = Instant::now();
        self.validator.validate(request)?;

        let fingerprint = request.fingerprint();
        if let Some(quotes) = self.cache.get(fingerprint.as_str()).await {
            self.sink.emit(&ResilienceEvent::CacheHit {
                fingerprint: fingerprint.to_string(),
                quotes: quotes.len(),
            });
            return Ok(RateResponse {
                quotes,
                failures: Vec::new(),
                cache_hit: true,
                latency_ms: elapsed_ms(started),
            });
        }
        self.sink.emit(&ResilienceEvent::CacheMiss {
            fingerprint: fingerprint.to_string(),
        });

        let outcomes = join_all(self.carriers.iter().map(|carrier| carrier.rates(request))).await;

        let mut quotes = Vec::new();
        let mut failures = Vec::new();
        for (carrier, outcome) in self.carriers.iter().zip(outcomes) {
            match outcome {
                Ok(carrier_quotes) => quotes.extend(carrier_quotes),
                Err(error) => {
                    self.sink.emit(&ResilienceEvent::CarrierFailed {
                        carrier: carrier.id().clone(),
                        error: error.clone(),
                    });
                    failures.push(CarrierFailure {
                        carrier: carrier.id().clone(),
                        error,
                    });
                }
            }
        }

        self.cache.put(fingerprint.as_str(), quotes.clone()).await;

        Ok(RateResponse {
            quotes,
            failures,
            cache_hit: false,
            latency_ms: elapsed_ms(started),
        })
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.len().await
    }
}

impl std::fmt::Debug for RateOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateOrchestrator")
            .field("carriers", &self.carrier_ids())
            .finish_non_exhaustive()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
