//! # Shipquote Core
//!
//! Resilient multi-carrier shipping-rate orchestration.
//!
//! ## Overview
//!
//! This crate provides the building blocks of the `shipquote` toolkit:
//!
//! - **Carrier-agnostic domain models** for requests, packages and quotes
//! - **A typed failure taxonomy** shared by every carrier
//! - **Resilience primitives**: circuit breaker, retry with jittered backoff,
//!   rate limiting and a single-flight bearer token manager
//! - **Carrier decorators** that layer those primitives around any adapter
//! - **A rate orchestrator** that fans out, tolerates partial failure and
//!   caches aggregates by request fingerprint
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Carrier adapters (UPS, static rate card) |
//! | [`cache`] | TTL cache store |
//! | [`carrier`] | Carrier trait and error taxonomy |
//! | [`circuit_breaker`] | Circuit breaker state machine |
//! | [`config`] | Environment configuration |
//! | [`domain`] | Domain models (RateRequest, RateQuote, CarrierId) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`observability`] | Resilience events and sinks |
//! | [`orchestrator`] | Fan-out, aggregation and caching |
//! | [`policy`] | Per-carrier resilience policies |
//! | [`rate_limit`] | Concurrency and pacing decorator |
//! | [`resilient`] | Circuit breaker + retry decorator |
//! | [`retry`] | Retry executor and backoff |
//! | [`token`] | Bearer token lifecycle |
//! | [`validation`] | Request validation |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shipquote_core::{
//!     Address, CarrierId, CarrierPolicy, Package, RateOrchestrator, RateRequest, StaticCarrier,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let carrier = StaticCarrier::demo(CarrierId::parse("offline")?);
//!     let orchestrator = RateOrchestrator::builder()
//!         .with_carrier(Arc::new(carrier), CarrierPolicy::unthrottled())
//!         .build()?;
//!
//!     let origin = Address::new(vec!["1 Main St".into()], "Austin", "TX", "78701", "US");
//!     let destination = Address::new(vec!["9 Elm St".into()], "Denver", "CO", "80202", "US");
//!     let request = RateRequest::new(origin, destination, vec![Package::new(5.0, None)]);
//!
//!     for quote in orchestrator.get_rates(&request).await? {
//!         println!("{} {}: {:.2} {}", quote.carrier, quote.service_name, quote.amount, quote.currency);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ RateOrchestrator │── validate ── cache ── join_all
//! └────────┬─────────┘
//!          │ one per carrier
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ ResilientCarrier │────▶│ Circuit Breaker  │
//! │                  │────▶│ Retry Executor   │
//! └────────┬─────────┘     └──────────────────┘
//!          ▼
//! ┌──────────────────┐
//! │ RateLimited      │  semaphore + governor quota
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Carrier adapter  │────▶│ Token Manager    │
//! │                  │────▶│ HTTP Client      │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Every failure that crosses the carrier boundary is a [`CarrierError`]:
//!
//! ```rust
//! use shipquote_core::{CarrierError, CarrierErrorKind};
//!
//! fn handle_error(error: &CarrierError) {
//!     match error.kind() {
//!         CarrierErrorKind::RateLimited | CarrierErrorKind::UpstreamUnavailable => {
//!             // transient; the decorators already retried
//!         }
//!         CarrierErrorKind::CircuitOpen => {
//!             // back off independently
//!         }
//!         CarrierErrorKind::ValidationError => {
//!             // report to user
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - Client secrets and bearer tokens are redacted from `Debug` output
//! - All HTTP requests use TLS via rustls

pub mod adapters;
pub mod cache;
pub mod carrier;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod observability;
pub mod orchestrator;
pub mod policy;
pub mod rate_limit;
pub mod resilient;
pub mod retry;
pub mod token;
pub mod validation;

// Adapter implementations
pub use adapters::{StaticCarrier, StaticService, UpsCarrier, UpsCredentialFetcher};

// Caching
pub use cache::CacheStore;

// Carrier trait and error taxonomy
pub use carrier::{Carrier, CarrierError, CarrierErrorKind, RateFuture};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Configuration
pub use config::{ConfigError, ShipquoteConfig, UpsSettings};

// Domain models
pub use domain::{
    validate_currency_code, Address, CarrierId, Dimensions, Fingerprint, Package, RateQuote,
    RateRequest, ServiceLevel,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpFuture, HttpMethod, HttpRequest,
    HttpResponse, ReqwestHttpClient,
};

// Observability
pub use observability::{
    EventSink, NoopEventSink, ResilienceEvent, SharedEventSink, TracingEventSink,
};

// Orchestration
pub use orchestrator::{
    CarrierFailure, RateOrchestrator, RateOrchestratorBuilder, RateResponse, DEFAULT_CACHE_TTL,
};

// Carrier policies
pub use policy::{BackoffPolicy, CarrierPolicy};

// Decorators
pub use rate_limit::{RateLimitConfig, RateLimitedCarrier};
pub use resilient::ResilientCarrier;

// Retry logic
pub use retry::{
    retryable_errors, retryable_except_auth, Backoff, RetryConfig, RetryExecutor, RetryPredicate,
};

// Token lifecycle
pub use token::{Credential, CredentialFetcher, CredentialFuture, TokenManager, TokenManagerConfig};

// Validation
pub use validation::{DefaultRequestValidator, RequestValidator};
