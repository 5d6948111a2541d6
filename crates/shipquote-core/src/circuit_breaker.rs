use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::observability::{default_sink, ResilienceEvent, SharedEventSink};
use crate::CarrierError;

/// Runtime circuit state for one protected dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in `Closed` before opening.
    pub failure_threshold: u32,
    /// Consecutive successes in `HalfOpen` before closing.
    pub success_threshold: u32,
    /// Time spent `Open` before a trial call is allowed.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    next_attempt_at: Option<Instant>,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            next_attempt_at: None,
        }
    }
}

impl CircuitInner {
    /// Lazy `Open -> HalfOpen` once the cooldown deadline has passed.
    fn refresh(&mut self, now: Instant) -> Option<(CircuitState, CircuitState)> {
        if self.state != CircuitState::Open {
            return None;
        }
        let elapsed = self
            .next_attempt_at
            .map(|deadline| now >= deadline)
            .unwrap_or(true);
        if !elapsed {
            return None;
        }

        self.state = CircuitState::HalfOpen;
        self.consecutive_successes = 0;
        self.next_attempt_at = None;
        Some((CircuitState::Open, CircuitState::HalfOpen))
    }

    fn trip(&mut self, now: Instant, cooldown: Duration) {
        self.state = CircuitState::Open;
        self.consecutive_successes = 0;
        self.next_attempt_at = Some(now + cooldown);
    }
}

/// Thread-safe circuit breaker guarding a single logical dependency.
///
/// State only changes through [`execute`](Self::execute), the lazy cooldown
/// check in [`state`](Self::state), and [`reset`](Self::reset).
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
    sink: SharedEventSink,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(CircuitInner::default()),
            sink: default_sink(),
        }
    }

    pub fn with_event_sink(mut self, sink: SharedEventSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    /// Runs `operation` if the circuit permits it.
    ///
    /// While open and cooling down this fails with a `CircuitOpen` error
    /// without invoking `operation`.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, CarrierError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CarrierError>>,
    {
        self.acquire()?;

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                self.record_failure();
                Err(error)
            }
        }
    }

    /// Current state, applying the cooldown check first.
    pub fn state(&self) -> CircuitState {
        let (state, transition) = {
            let mut inner = self.lock();
            let transition = inner.refresh(Instant::now());
            (inner.state, transition)
        };
        self.report(transition);
        state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.lock().consecutive_successes
    }

    /// Forces the circuit closed and clears all counters.
    pub fn reset(&self) {
        let previous = {
            let mut inner = self.lock();
            let previous = inner.state;
            *inner = CircuitInner::default();
            previous
        };
        if previous != CircuitState::Closed {
            self.report(Some((previous, CircuitState::Closed)));
        }
    }

    fn acquire(&self) -> Result<(), CarrierError> {
        let now = Instant::now();
        let (outcome, transition) = {
            let mut inner = self.lock();
            let transition = inner.refresh(now);
            let outcome = match inner.state {
                CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
                CircuitState::Open => {
                    let remaining = inner
                        .next_attempt_at
                        .map(|deadline| deadline.saturating_duration_since(now))
                        .unwrap_or_default();
                    Err(CarrierError::circuit_open(format!(
                        "circuit '{}' is open; next attempt in {}ms",
                        self.name,
                        remaining.as_millis()
                    )))
                }
            };
            (outcome, transition)
        };
        self.report(transition);
        outcome
    }

    fn record_success(&self) {
        let transition = {
            let mut inner = self.lock();
            match inner.state {
                CircuitState::Closed => {
                    inner.consecutive_failures = 0;
                    None
                }
                CircuitState::HalfOpen => {
                    inner.consecutive_successes = inner.consecutive_successes.saturating_add(1);
                    if inner.consecutive_successes >= self.config.success_threshold {
                        *inner = CircuitInner::default();
                        Some((CircuitState::HalfOpen, CircuitState::Closed))
                    } else {
                        None
                    }
                }
                // A call admitted before the circuit opened; its outcome is stale.
                CircuitState::Open => None,
            }
        };
        self.report(transition);
    }

    fn record_failure(&self) {
        let now = Instant::now();
        let transition = {
            let mut inner = self.lock();
            match inner.state {
                CircuitState::Closed => {
                    inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                    if inner.consecutive_failures >= self.config.failure_threshold {
                        inner.trip(now, self.config.cooldown);
                        Some((CircuitState::Closed, CircuitState::Open))
                    } else {
                        None
                    }
                }
                CircuitState::HalfOpen => {
                    inner.consecutive_failures = 1;
                    inner.trip(now, self.config.cooldown);
                    Some((CircuitState::HalfOpen, CircuitState::Open))
                }
                CircuitState::Open => None,
            }
        };
        self.report(transition);
    }

    fn report(&self, transition: Option<(CircuitState, CircuitState)>) {
        if let Some((from, to)) = transition {
            self.sink.emit(&ResilienceEvent::CircuitTransition {
                name: self.name.clone(),
                from,
                to,
            });
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CircuitInner> {
        self.inner
            .lock()
            .expect("circuit breaker lock is not poisoned")
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("inner", &self.inner)
            .finish()
    }
}
