//! Behavior-driven tests for the resilience primitives
//!
//! These tests verify HOW the circuit breaker, retry executor and rate limiter
//! behave when a dependency misbehaves.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shipquote_core::{
    retryable_errors, Address, Carrier, CarrierError, CarrierErrorKind, CarrierId,
    CircuitBreaker, CircuitBreakerConfig, CircuitState, EventSink, Package, RateFuture,
    RateLimitConfig, RateLimitedCarrier, RateQuote, RateRequest, ResilienceEvent, RetryConfig,
    RetryExecutor,
};
use tokio::time::Instant;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ResilienceEvent>>,
}

impl RecordingSink {
    fn transitions(&self) -> Vec<(CircuitState, CircuitState)> {
        self.events
            .lock()
            .expect("event log")
            .iter()
            .filter_map(|event| match event {
                ResilienceEvent::CircuitTransition { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &ResilienceEvent) {
        self.events.lock().expect("event log").push(event.clone());
    }
}

async fn fail(breaker: &CircuitBreaker) -> CarrierError {
    breaker
        .execute(|| async { Err::<(), _>(CarrierError::upstream_unavailable("503")) })
        .await
        .expect_err("operation fails")
}

async fn succeed(breaker: &CircuitBreaker) {
    breaker
        .execute(|| async { Ok::<_, CarrierError>(()) })
        .await
        .expect("operation succeeds");
}

// =============================================================================
// Circuit Breaker
// =============================================================================

#[tokio::test(start_paused = true)]
async fn circuit_walks_closed_open_half_open_closed() {
    // Given: A breaker that opens after 3 failures and closes after 2 successes
    let sink = Arc::new(RecordingSink::default());
    let breaker = CircuitBreaker::new(
        "ups",
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            cooldown: Duration::from_secs(30),
        },
    )
    .with_event_sink(sink.clone());

    // When: Exactly three consecutive failures happen
    for _ in 0..3 {
        fail(&breaker).await;
    }

    // Then: The circuit is open and sheds calls without running them
    assert_eq!(breaker.state(), CircuitState::Open);
    let invoked = AtomicU32::new(0);
    let error = breaker
        .execute(|| async {
            invoked.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CarrierError>(())
        })
        .await
        .expect_err("shed while open");
    assert_eq!(error.kind(), CarrierErrorKind::CircuitOpen);
    assert_eq!(invoked.load(Ordering::SeqCst), 0);

    // When: The cooldown elapses
    tokio::time::advance(Duration::from_secs(30)).await;

    // Then: The next observation reports half-open
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    // When: Two trial calls succeed
    succeed(&breaker).await;
    succeed(&breaker).await;

    // Then: The circuit is closed again and every transition was reported
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(
        sink.transitions(),
        vec![
            (CircuitState::Closed, CircuitState::Open),
            (CircuitState::Open, CircuitState::HalfOpen),
            (CircuitState::HalfOpen, CircuitState::Closed),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn a_single_half_open_failure_reopens_the_circuit() {
    // Given: An open circuit whose cooldown has elapsed
    let breaker = CircuitBreaker::new(
        "ups",
        CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 3,
            cooldown: Duration::from_secs(5),
        },
    );
    fail(&breaker).await;
    fail(&breaker).await;
    tokio::time::advance(Duration::from_secs(5)).await;

    // When: One trial succeeds and the next fails
    succeed(&breaker).await;
    fail(&breaker).await;

    // Then: The circuit reopens with a fresh cooldown
    assert_eq!(breaker.state(), CircuitState::Open);
    tokio::time::advance(Duration::from_secs(4)).await;
    assert_eq!(breaker.state(), CircuitState::Open);
    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

// =============================================================================
// Retry Executor
// =============================================================================

#[tokio::test(start_paused = true)]
async fn fail_fail_succeed_takes_jittered_one_plus_two_seconds() {
    // Given: 3 attempts, 1000ms initial delay, multiplier 2
    let retry = RetryExecutor::new(
        "ups",
        RetryConfig::exponential(3, Duration::from_millis(1000), 2.0, Duration::from_secs(30)),
        retryable_errors(),
    );
    let calls = AtomicU32::new(0);
    let started = Instant::now();

    // When: The operation fails twice then succeeds
    let value = retry
        .run(|| async {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call < 3 {
                Err(CarrierError::upstream_unavailable(format!("attempt {call}")))
            } else {
                Ok(call)
            }
        })
        .await
        .expect("third attempt succeeds");

    // Then: Three invocations and total backoff within 3000ms scaled by [0.75, 1.25]
    let elapsed = started.elapsed();
    assert_eq!(value, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(elapsed >= Duration::from_millis(2250), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(3750), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn non_retryable_failure_is_attempted_once_and_returned_immediately() {
    // Given: A predicate that refuses every retry
    let retry = RetryExecutor::new(
        "ups",
        RetryConfig::exponential(5, Duration::from_secs(1), 2.0, Duration::from_secs(30)),
        Arc::new(|_: &CarrierError| false),
    );
    let calls = AtomicU32::new(0);
    let started = Instant::now();

    // When: The operation fails
    let error = retry
        .run(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(CarrierError::rate_limited("429"))
        })
        .await
        .expect_err("no retry");

    // Then: Exactly one invocation, no delay, original error preserved
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(error.kind(), CarrierErrorKind::RateLimited);
}

#[tokio::test(start_paused = true)]
async fn backoff_of_one_call_does_not_stall_another() {
    // Given: One operation stuck in backoff and one that succeeds immediately
    let retry = RetryExecutor::new(
        "ups",
        RetryConfig::fixed(Duration::from_secs(10), 2),
        retryable_errors(),
    );
    let fast_done_at = Mutex::new(None);
    let started = Instant::now();

    // When: Both run concurrently
    let slow = retry.run(|| async { Err::<(), _>(CarrierError::network("reset")) });
    let fast = async {
        retry
            .run(|| async { Ok::<_, CarrierError>(()) })
            .await
            .expect("fast succeeds");
        *fast_done_at.lock().expect("slot") = Some(started.elapsed());
    };
    let (slow_result, ()) = tokio::join!(slow, fast);

    // Then: The fast call finished without waiting for the slow backoff
    assert!(slow_result.is_err());
    assert_eq!(
        *fast_done_at.lock().expect("slot"),
        Some(Duration::ZERO)
    );
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

// =============================================================================
// Rate Limiter
// =============================================================================

struct GatedCarrier {
    id: CarrierId,
    in_flight: AtomicU32,
    peak: AtomicU32,
}

impl Carrier for GatedCarrier {
    fn id(&self) -> &CarrierId {
        &self.id
    }

    fn rates<'a>(&'a self, _request: &'a RateRequest) -> RateFuture<'a> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(250)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let quote = RateQuote::new(self.id.clone(), "GND", "Ground", 7.0, "USD", None)?;
            Ok(vec![quote])
        })
    }
}

#[tokio::test(start_paused = true)]
async fn rate_limiter_queues_excess_calls_instead_of_failing() {
    // Given: A carrier limited to 3 concurrent calls
    let inner = Arc::new(GatedCarrier {
        id: CarrierId::parse("gated").expect("valid carrier id"),
        in_flight: AtomicU32::new(0),
        peak: AtomicU32::new(0),
    });
    let sink = Arc::new(RecordingSink::default());
    let limited = RateLimitedCarrier::new(
        inner.clone(),
        RateLimitConfig {
            max_concurrency: 3,
            quota_window: Duration::ZERO,
            quota_limit: 0,
            saturation_threshold: 5,
        },
    )
    .with_event_sink(sink.clone());
    let address = Address::new(vec![String::from("1 Main St")], "Austin", "TX", "78701", "US");
    let request = RateRequest::new(address.clone(), address, vec![Package::new(1.0, None)]);

    // When: Ten calls are issued at once
    let started = Instant::now();
    let results = futures::future::join_all((0..10).map(|_| limited.rates(&request))).await;

    // Then: All succeed, at most three ran together, in four waves
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(inner.peak.load(Ordering::SeqCst), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(1000));

    // And: Queue saturation was signalled once
    let saturated = sink
        .events
        .lock()
        .expect("event log")
        .iter()
        .filter(|event| matches!(event, ResilienceEvent::QueueSaturated { .. }))
        .count();
    assert_eq!(saturated, 1);
}
