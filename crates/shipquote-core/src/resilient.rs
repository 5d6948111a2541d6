use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::time::Instant;

use crate::carrier::{Carrier, RateFuture};
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::observability::{default_sink, ResilienceEvent, SharedEventSink};
use crate::retry::{retryable_except_auth, RetryConfig, RetryExecutor};
use crate::{CarrierId, RateRequest};

/// Carrier decorator adding a circuit breaker around a retry loop.
///
/// A request runs as `breaker.execute(retry.run(inner.rates))`, so an open
/// circuit sheds the call before any attempt and an exhausted retry loop counts
/// as one breaker failure. Authentication failures are left to the adapter's
/// own credential refresh.
pub struct ResilientCarrier {
    inner: Arc<dyn Carrier>,
    breaker: CircuitBreaker,
    retry: RetryExecutor,
    sink: SharedEventSink,
}

impl ResilientCarrier {
    pub fn new(
        inner: Arc<dyn Carrier>,
        retry: RetryConfig,
        circuit: CircuitBreakerConfig,
    ) -> Self {
        let name = inner.id().to_string();
        Self {
            breaker: CircuitBreaker::new(name.clone(), circuit),
            retry: RetryExecutor::new(name, retry, retryable_except_auth()),
            inner,
            sink: default_sink(),
        }
    }

    pub fn with_event_sink(mut self, sink: SharedEventSink) -> Self {
        self.breaker = self.breaker.with_event_sink(Arc::clone(&sink));
        self.retry = self.retry.with_event_sink(Arc::clone(&sink));
        self.sink = sink;
        self
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl Carrier for ResilientCarrier {
    fn id(&self) -> &CarrierId {
        self.inner.id()
    }

    fn rates<'a>(&'a self, request: &'a RateRequest) -> RateFuture<'a> {
        Box::pin(async move {
            let started = Instant::now();
            let circuit_state = self.breaker.state();
            let attempts = AtomicU32::new(0);

            let result = self
                .breaker
                .execute(|| {
                    self.retry.run(|| {
                        attempts.fetch_add(1, Ordering::Relaxed);
                        self.inner.rates(request)
                    })
                })
                .await;

            self.sink.emit(&ResilienceEvent::CarrierCallCompleted {
                carrier: self.inner.id().clone(),
                attempts: attempts.load(Ordering::Relaxed),
                elapsed: started.elapsed(),
                circuit_state,
                error_kind: result.as_ref().err().map(|error| error.kind()),
            });

            result.map_err(|error| match error.carrier() {
                Some(_) => error,
                None => error.with_carrier(self.inner.id().clone()),
            })
        })
    }
}

impl std::fmt::Debug for ResilientCarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientCarrier")
            .field("carrier", self.inner.id())
            .field("breaker", &self.breaker)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
