use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use tokio::sync::{Mutex, Semaphore};

use crate::carrier::{Carrier, RateFuture};
use crate::observability::{default_sink, ResilienceEvent, SharedEventSink};
use crate::{CarrierError, CarrierId, RateRequest};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Concurrency and pacing limits for one carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum calls in flight at once.
    pub max_concurrency: usize,
    /// Window over which `quota_limit` call starts are allowed.
    /// `Duration::ZERO` disables pacing.
    pub quota_window: Duration,
    pub quota_limit: u32,
    /// Number of queued callers at which a saturation event is emitted.
    pub saturation_threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            quota_window: Duration::from_secs(1),
            quota_limit: 10,
            saturation_threshold: 16,
        }
    }
}

/// Carrier decorator that queues calls beyond the configured limits.
///
/// Callers wait in FIFO order for a concurrency permit, then in FIFO order for
/// the pacing quota. Nothing is rejected.
pub struct RateLimitedCarrier {
    inner: Arc<dyn Carrier>,
    config: RateLimitConfig,
    permits: Arc<Semaphore>,
    pacing: Option<Pacing>,
    queued: AtomicUsize,
    sink: SharedEventSink,
}

struct Pacing {
    limiter: DirectRateLimiter,
    gate: Mutex<()>,
}

impl RateLimitedCarrier {
    pub fn new(inner: Arc<dyn Carrier>, config: RateLimitConfig) -> Self {
        let pacing = (!config.quota_window.is_zero()).then(|| Pacing {
            limiter: RateLimiter::direct(quota_from_window(config.quota_window, config.quota_limit)),
            gate: Mutex::new(()),
        });

        Self {
            inner,
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            config,
            pacing,
            queued: AtomicUsize::new(0),
            sink: default_sink(),
        }
    }

    pub fn with_event_sink(mut self, sink: SharedEventSink) -> Self {
        self.sink = sink;
        self
    }

    pub const fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Callers currently waiting for a concurrency permit.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    async fn admit(&self) -> Result<tokio::sync::SemaphorePermit<'_>, CarrierError> {
        let permit = match self.permits.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                let _queued = QueuedGuard::enter(self);
                self.permits.acquire().await.map_err(|_| {
                    CarrierError::unknown("rate limiter was shut down")
                        .with_carrier(self.inner.id().clone())
                })?
            }
        };

        if let Some(pacing) = &self.pacing {
            let _gate = pacing.gate.lock().await;
            pacing.limiter.until_ready().await;
        }

        Ok(permit)
    }
}

impl Carrier for RateLimitedCarrier {
    fn id(&self) -> &CarrierId {
        self.inner.id()
    }

    fn rates<'a>(&'a self, request: &'a RateRequest) -> RateFuture<'a> {
        Box::pin(async move {
            let _permit = self.admit().await?;
            self.inner.rates(request).await
        })
    }
}

/// Tracks one queued caller; decrements on drop so abandoned waits are counted out.
struct QueuedGuard<'a> {
    owner: &'a RateLimitedCarrier,
}

impl<'a> QueuedGuard<'a> {
    fn enter(owner: &'a RateLimitedCarrier) -> Self {
        let queued = owner.queued.fetch_add(1, Ordering::SeqCst) + 1;
        if queued == owner.config.saturation_threshold.max(1) {
            owner.sink.emit(&ResilienceEvent::QueueSaturated {
                carrier: owner.inner.id().clone(),
                waiting: queued,
                max_concurrency: owner.config.max_concurrency,
            });
        }
        Self { owner }
    }
}

impl Drop for QueuedGuard<'_> {
    fn drop(&mut self) {
        self.owner.queued.fetch_sub(1, Ordering::SeqCst);
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
