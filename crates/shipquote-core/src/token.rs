//! Bearer token lifecycle.
//!
//! [`TokenManager`] caches one credential and refreshes it through a
//! [`CredentialFetcher`]. Concurrent callers that find no usable token share a
//! single in-flight refresh, so the issuer sees exactly one fetch per expiry.
//!
//! The refresh buffer is subtracted from the server lifetime when the token is
//! stored, so a plain `now < expires_at` check already refreshes early.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

use crate::observability::{default_sink, ResilienceEvent, SharedEventSink};
use crate::retry::{retryable_except_auth, RetryConfig, RetryExecutor};
use crate::CarrierError;

/// Credential returned by the remote issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    /// Lifetime reported by the issuer, measured from receipt.
    pub lifetime: Duration,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            access_token: access_token.into(),
            lifetime,
        }
    }
}

pub type CredentialFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Credential, CarrierError>> + Send + 'a>>;

/// Opaque credential issuance; the token manager does not know the protocol.
pub trait CredentialFetcher: Send + Sync {
    fn fetch(&self) -> CredentialFuture<'_>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenManagerConfig {
    /// Margin before the server-side expiry at which the token is refreshed.
    pub refresh_buffer: Duration,
    /// Retry schedule for transient issuer failures.
    pub retry: RetryConfig,
}

impl Default for TokenManagerConfig {
    fn default() -> Self {
        Self {
            refresh_buffer: Duration::from_secs(60),
            retry: RetryConfig::exponential(
                3,
                Duration::from_millis(500),
                2.0,
                Duration::from_secs(5),
            ),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String, CarrierError>>>;

#[derive(Default)]
struct TokenState {
    cached: Option<CachedToken>,
    in_flight: Option<RefreshFuture>,
}

/// Caches and refreshes a single bearer credential.
pub struct TokenManager {
    name: String,
    fetcher: Arc<dyn CredentialFetcher>,
    config: TokenManagerConfig,
    state: Arc<Mutex<TokenState>>,
    retry: RetryExecutor,
    sink: SharedEventSink,
}

impl TokenManager {
    pub fn new(
        name: impl Into<String>,
        fetcher: Arc<dyn CredentialFetcher>,
        config: TokenManagerConfig,
    ) -> Self {
        let name = name.into();
        let sink = default_sink();
        Self {
            retry: RetryExecutor::new(
                format!("{name}.token"),
                config.retry,
                retryable_except_auth(),
            )
            .with_event_sink(Arc::clone(&sink)),
            name,
            fetcher,
            config,
            state: Arc::new(Mutex::new(TokenState::default())),
            sink,
        }
    }

    pub fn with_event_sink(mut self, sink: SharedEventSink) -> Self {
        self.retry = self.retry.with_event_sink(Arc::clone(&sink));
        self.sink = sink;
        self
    }

    pub const fn config(&self) -> TokenManagerConfig {
        self.config
    }

    /// Returns a usable bearer token, fetching one if needed.
    ///
    /// # Errors
    ///
    /// Returns an `AuthFailed` error when the issuer could not produce a token
    /// after retries. Nothing is cached in that case.
    pub async fn token(&self) -> Result<String, CarrierError> {
        let refresh = {
            let mut state = lock(&self.state);
            if let Some(cached) = state.cached.as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.value.clone());
                }
            }

            match state.in_flight.as_ref() {
                Some(in_flight) => in_flight.clone(),
                None => {
                    let refresh = self.start_refresh();
                    state.in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    /// Drops the cached token so the next call fetches a fresh one.
    ///
    /// A refresh already in flight is left running and still stores its token
    /// when it completes; callers that joined it receive that token.
    pub fn clear_cache(&self) {
        lock(&self.state).cached = None;
    }

    /// Whether a token is cached and still inside its usable window.
    pub fn has_valid_token(&self) -> bool {
        lock(&self.state)
            .cached
            .as_ref()
            .map(|cached| Instant::now() < cached.expires_at)
            .unwrap_or(false)
    }

    fn start_refresh(&self) -> RefreshFuture {
        let fetcher = Arc::clone(&self.fetcher);
        let state = Arc::clone(&self.state);
        let retry = self.retry.clone();
        let sink = Arc::clone(&self.sink);
        let name = self.name.clone();
        let buffer = self.config.refresh_buffer;

        async move {
            let result = retry.run(|| fetcher.fetch()).await;
            let outcome = complete_refresh(&state, result, buffer);

            match &outcome {
                Ok(credential) => sink.emit(&ResilienceEvent::TokenRefreshed {
                    credential: name,
                    lifetime: credential.lifetime,
                }),
                Err(error) => sink.emit(&ResilienceEvent::TokenRefreshFailed {
                    credential: name,
                    error: error.clone(),
                }),
            }

            outcome.map(|credential| credential.access_token)
        }
        .boxed()
        .shared()
    }
}

/// Stores the refresh outcome and clears the in-flight slot on every path.
fn complete_refresh(
    state: &Mutex<TokenState>,
    result: Result<Credential, CarrierError>,
    buffer: Duration,
) -> Result<Credential, CarrierError> {
    let mut state = lock(state);
    state.in_flight = None;

    match result {
        Ok(credential) => {
            let usable = credential.lifetime.saturating_sub(buffer);
            state.cached = Some(CachedToken {
                value: credential.access_token.clone(),
                expires_at: Instant::now() + usable,
            });
            Ok(credential)
        }
        Err(error) => Err(CarrierError::auth_failed(format!(
            "credential acquisition failed: {}",
            error.message()
        ))
        .with_retryable(false)
        .with_cause(error)),
    }
}

fn lock(state: &Mutex<TokenState>) -> MutexGuard<'_, TokenState> {
    state.lock().expect("token state lock is not poisoned")
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
