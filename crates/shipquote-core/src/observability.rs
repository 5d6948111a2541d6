//! Structured resilience events.
//!
//! Components never log directly through a global; each one receives an
//! `Arc<dyn EventSink>` at construction and reports what happened as a typed
//! [`ResilienceEvent`]. [`TracingEventSink`] renders events through `tracing`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{CarrierError, CarrierErrorKind, CarrierId, CircuitState};

/// Diagnostic event emitted by the resilience core.
#[derive(Debug, Clone)]
pub enum ResilienceEvent {
    CircuitTransition {
        name: String,
        from: CircuitState,
        to: CircuitState,
    },
    RetryScheduled {
        operation: String,
        attempt: u32,
        delay: Duration,
        error_kind: CarrierErrorKind,
    },
    CarrierCallCompleted {
        carrier: CarrierId,
        attempts: u32,
        elapsed: Duration,
        circuit_state: CircuitState,
        error_kind: Option<CarrierErrorKind>,
    },
    QueueSaturated {
        carrier: CarrierId,
        waiting: usize,
        max_concurrency: usize,
    },
    CarrierFailed {
        carrier: CarrierId,
        error: CarrierError,
    },
    CacheHit {
        fingerprint: String,
        quotes: usize,
    },
    CacheMiss {
        fingerprint: String,
    },
    TokenRefreshed {
        credential: String,
        lifetime: Duration,
    },
    TokenRefreshFailed {
        credential: String,
        error: CarrierError,
    },
}

/// Observer hook for [`ResilienceEvent`]s.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ResilienceEvent);
}

/// Shared sink handle passed into components.
pub type SharedEventSink = Arc<dyn EventSink>;

/// Default sink that renders events as `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &ResilienceEvent) {
        match event {
            ResilienceEvent::CircuitTransition { name, from, to } => {
                if *to == CircuitState::Open {
                    warn!(circuit = %name, from = ?from, to = ?to, "circuit opened");
                } else {
                    info!(circuit = %name, from = ?from, to = ?to, "circuit state changed");
                }
            }
            ResilienceEvent::RetryScheduled {
                operation,
                attempt,
                delay,
                error_kind,
            } => {
                debug!(
                    operation = %operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error_kind = %error_kind,
                    "retry scheduled"
                );
            }
            ResilienceEvent::CarrierCallCompleted {
                carrier,
                attempts,
                elapsed,
                circuit_state,
                error_kind,
            } => match error_kind {
                Some(kind) => warn!(
                    carrier = %carrier,
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    circuit_state = ?circuit_state,
                    error_kind = %kind,
                    "carrier call failed"
                ),
                None => debug!(
                    carrier = %carrier,
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    circuit_state = ?circuit_state,
                    "carrier call succeeded"
                ),
            },
            ResilienceEvent::QueueSaturated {
                carrier,
                waiting,
                max_concurrency,
            } => {
                warn!(carrier = %carrier, waiting, max_concurrency, "rate limiter queue saturated");
            }
            ResilienceEvent::CarrierFailed { carrier, error } => {
                warn!(
                    carrier = %carrier,
                    code = error.code(),
                    retryable = error.retryable(),
                    error = %error.message(),
                    "carrier omitted from aggregate"
                );
            }
            ResilienceEvent::CacheHit {
                fingerprint,
                quotes,
            } => {
                debug!(fingerprint = %fingerprint, quotes, "rate cache hit");
            }
            ResilienceEvent::CacheMiss { fingerprint } => {
                debug!(fingerprint = %fingerprint, "rate cache miss");
            }
            ResilienceEvent::TokenRefreshed {
                credential,
                lifetime,
            } => {
                debug!(
                    credential = %credential,
                    lifetime_secs = lifetime.as_secs(),
                    "bearer token refreshed"
                );
            }
            ResilienceEvent::TokenRefreshFailed { credential, error } => {
                warn!(
                    credential = %credential,
                    code = error.code(),
                    error = %error.message(),
                    "bearer token refresh failed"
                );
            }
        }
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &ResilienceEvent) {}
}

pub(crate) fn default_sink() -> SharedEventSink {
    Arc::new(TracingEventSink)
}
