use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::rate_limit::RateLimitConfig;
use crate::retry::RetryConfig;

/// Per-carrier resilience settings applied by the orchestrator builder.
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierPolicy {
    pub max_concurrency: usize,
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub saturation_threshold: usize,
    pub retry_backoff: BackoffPolicy,
    pub circuit: CircuitBreakerConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Total attempts including the first.
    pub max_attempts: u32,
}

impl Default for CarrierPolicy {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            quota_window: Duration::from_secs(1),
            quota_limit: 10,
            saturation_threshold: 16,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(10),
                multiplier: 2.0,
                max_attempts: 3,
            },
            circuit: CircuitBreakerConfig::default(),
        }
    }
}

impl CarrierPolicy {
    pub fn ups_default() -> Self {
        Self {
            max_concurrency: 5,
            quota_window: Duration::from_secs(1),
            quota_limit: 10,
            saturation_threshold: 20,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(10),
                multiplier: 2.0,
                max_attempts: 3,
            },
            circuit: CircuitBreakerConfig {
                failure_threshold: 5,
                success_threshold: 2,
                cooldown: Duration::from_secs(60),
            },
        }
    }

    /// Policy for in-process carriers: no pacing, no retry, wide concurrency.
    pub fn unthrottled() -> Self {
        Self {
            max_concurrency: 64,
            quota_window: Duration::ZERO,
            quota_limit: 0,
            saturation_threshold: 256,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
                multiplier: 1.0,
                max_attempts: 1,
            },
            circuit: CircuitBreakerConfig::default(),
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_concurrency: self.max_concurrency,
            quota_window: self.quota_window,
            quota_limit: self.quota_limit,
            saturation_threshold: self.saturation_threshold,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::exponential(
            self.retry_backoff.max_attempts,
            self.retry_backoff.initial_delay,
            self.retry_backoff.multiplier,
            self.retry_backoff.max_delay,
        )
    }
}
