//! Retry logic with exponential backoff and jitter.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::observability::{default_sink, ResilienceEvent, SharedEventSink};
use crate::{CarrierError, CarrierErrorKind};

/// Fraction of the computed delay applied as symmetric jitter.
const JITTER_RATIO: f64 = 0.25;

/// Backoff strategy for retrying failed operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ retry)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to scale the delay by a random factor in `[0.75, 1.25]`.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Calculate the delay before retry number `retry` (0-based).
    pub fn delay(self, retry: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(retry.min(i32::MAX as u32) as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                let scaled = if jitter {
                    let spread = 1.0 - JITTER_RATIO + fastrand::f64() * (2.0 * JITTER_RATIO);
                    capped_seconds * spread
                } else {
                    capped_seconds
                };

                Duration::from_secs_f64(scaled.max(0.0))
            }
        }
    }
}

/// Retry budget and delay schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// The backoff strategy to use between attempts.
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    /// Exponential backoff with jitter.
    pub fn exponential(max_attempts: u32, base: Duration, factor: f64, max: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                base,
                factor,
                max,
                jitter: true,
            },
        }
    }

    /// Fixed delay between attempts.
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
        }
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calculate the delay before retry number `retry` (0-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }
}

/// Decides whether a failure may be retried.
pub type RetryPredicate = Arc<dyn Fn(&CarrierError) -> bool + Send + Sync>;

/// Retries on errors flagged retryable, except authentication failures which
/// need a credential refresh rather than another attempt with the same token.
pub fn retryable_except_auth() -> RetryPredicate {
    Arc::new(|error: &CarrierError| {
        error.retryable() && error.kind() != CarrierErrorKind::AuthFailed
    })
}

/// Retries on every error flagged retryable.
pub fn retryable_errors() -> RetryPredicate {
    Arc::new(|error: &CarrierError| error.retryable())
}

/// Executes an async operation with backoff between failed attempts.
///
/// Backoff suspends only the calling task.
#[derive(Clone)]
pub struct RetryExecutor {
    name: String,
    config: RetryConfig,
    is_retryable: RetryPredicate,
    sink: SharedEventSink,
}

impl RetryExecutor {
    pub fn new(name: impl Into<String>, config: RetryConfig, is_retryable: RetryPredicate) -> Self {
        Self {
            name: name.into(),
            config,
            is_retryable,
            sink: default_sink(),
        }
    }

    pub fn with_event_sink(mut self, sink: SharedEventSink) -> Self {
        self.sink = sink;
        self
    }

    pub const fn config(&self) -> RetryConfig {
        self.config
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. The last real error is returned.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, CarrierError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CarrierError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1_u32;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= max_attempts || !(self.is_retryable)(&error) {
                return Err(error);
            }

            let delay = self.config.delay_for_retry(attempt - 1);
            self.sink.emit(&ResilienceEvent::RetryScheduled {
                operation: self.name.clone(),
                attempt,
                delay,
                error_kind: error.kind(),
            });
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
