//! Carrier capability and error taxonomy.
//!
//! This module defines the contract (`Carrier`) that every carrier adapter and
//! every decorator implements, along with the only error shape that crosses the
//! orchestration boundary ([`CarrierError`]).
//!
//! # Error kinds
//!
//! | Kind | Retryable by default | Notes |
//! |------|----------------------|-------|
//! | [`AuthFailed`](CarrierErrorKind::AuthFailed) | yes | recovered by a one-shot token refresh in the adapter, never blind retry |
//! | [`RateLimited`](CarrierErrorKind::RateLimited) | yes | |
//! | [`UpstreamUnavailable`](CarrierErrorKind::UpstreamUnavailable) | yes | 502/503/504 |
//! | [`UpstreamError`](CarrierErrorKind::UpstreamError) | yes | other 5xx |
//! | [`NetworkError`](CarrierErrorKind::NetworkError) | yes | transport failure |
//! | [`InvalidRequest`](CarrierErrorKind::InvalidRequest) | no | |
//! | [`InvalidResponse`](CarrierErrorKind::InvalidResponse) | no | |
//! | [`CircuitOpen`](CarrierErrorKind::CircuitOpen) | no | synthetic, produced by the circuit breaker |
//! | [`ValidationError`](CarrierErrorKind::ValidationError) | no | request rejected before any network call |
//! | [`UnknownError`](CarrierErrorKind::UnknownError) | no | |
//!
//! # Example
//!
//! ```rust,ignore
//! use shipquote_core::{Carrier, CarrierError, RateRequest};
//!
//! async fn cheapest(carrier: &dyn Carrier, request: &RateRequest) -> Result<f64, CarrierError> {
//!     let quotes = carrier.rates(request).await?;
//!     Ok(quotes.iter().map(|quote| quote.amount).fold(f64::INFINITY, f64::min))
//! }
//! ```

use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CarrierId, RateQuote, RateRequest, ValidationError};

/// Fixed failure taxonomy shared by all carriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierErrorKind {
    AuthFailed,
    RateLimited,
    UpstreamUnavailable,
    UpstreamError,
    NetworkError,
    InvalidRequest,
    InvalidResponse,
    CircuitOpen,
    ValidationError,
    UnknownError,
}

impl CarrierErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthFailed => "auth_failed",
            Self::RateLimited => "rate_limited",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::UpstreamError => "upstream_error",
            Self::NetworkError => "network_error",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidResponse => "invalid_response",
            Self::CircuitOpen => "circuit_open",
            Self::ValidationError => "validation_error",
            Self::UnknownError => "unknown_error",
        }
    }

    pub const fn default_retryable(self) -> bool {
        matches!(
            self,
            Self::AuthFailed
                | Self::RateLimited
                | Self::UpstreamUnavailable
                | Self::UpstreamError
                | Self::NetworkError
        )
    }
}

impl Display for CarrierErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured carrier failure.
///
/// The wrapped cause is reference counted so one failure can be handed to
/// every waiter of a shared operation.
#[derive(Debug, Clone)]
pub struct CarrierError {
    kind: CarrierErrorKind,
    carrier: Option<CarrierId>,
    message: String,
    retryable: bool,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
}

impl CarrierError {
    pub fn new(kind: CarrierErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            carrier: None,
            message: message.into(),
            retryable: kind.default_retryable(),
            cause: None,
        }
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(CarrierErrorKind::AuthFailed, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(CarrierErrorKind::RateLimited, message)
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(CarrierErrorKind::UpstreamUnavailable, message)
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::new(CarrierErrorKind::UpstreamError, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(CarrierErrorKind::NetworkError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(CarrierErrorKind::InvalidRequest, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(CarrierErrorKind::InvalidResponse, message)
    }

    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self::new(CarrierErrorKind::CircuitOpen, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(CarrierErrorKind::ValidationError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(CarrierErrorKind::UnknownError, message)
    }

    /// Classify a non-success HTTP status returned by a carrier API.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => CarrierErrorKind::AuthFailed,
            429 => CarrierErrorKind::RateLimited,
            502..=504 => CarrierErrorKind::UpstreamUnavailable,
            500..=599 => CarrierErrorKind::UpstreamError,
            400..=499 => CarrierErrorKind::InvalidRequest,
            _ => CarrierErrorKind::UnknownError,
        };
        Self::new(kind, message)
    }

    pub fn with_carrier(mut self, carrier: CarrierId) -> Self {
        self.carrier = Some(carrier);
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub const fn kind(&self) -> CarrierErrorKind {
        self.kind
    }

    pub fn carrier(&self) -> Option<&CarrierId> {
        self.carrier.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            CarrierErrorKind::AuthFailed => "carrier.auth_failed",
            CarrierErrorKind::RateLimited => "carrier.rate_limited",
            CarrierErrorKind::UpstreamUnavailable => "carrier.upstream_unavailable",
            CarrierErrorKind::UpstreamError => "carrier.upstream_error",
            CarrierErrorKind::NetworkError => "carrier.network_error",
            CarrierErrorKind::InvalidRequest => "carrier.invalid_request",
            CarrierErrorKind::InvalidResponse => "carrier.invalid_response",
            CarrierErrorKind::CircuitOpen => "carrier.circuit_open",
            CarrierErrorKind::ValidationError => "carrier.validation_error",
            CarrierErrorKind::UnknownError => "carrier.unknown_error",
        }
    }
}

impl Display for CarrierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.carrier {
            Some(carrier) => write!(f, "{carrier}: {} ({})", self.message, self.code()),
            None => write!(f, "{} ({})", self.message, self.code()),
        }
    }
}

impl StdError for CarrierError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl From<ValidationError> for CarrierError {
    fn from(error: ValidationError) -> Self {
        Self::validation(error.to_string()).with_cause(error)
    }
}

/// Boxed future returned by [`Carrier::rates`].
pub type RateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<RateQuote>, CarrierError>> + Send + 'a>>;

/// Carrier capability consumed by the orchestrator.
///
/// Raw adapters and decorators implement the same contract, so resilience
/// layers compose by nesting `Arc<dyn Carrier>` values.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared across tasks.
pub trait Carrier: Send + Sync {
    /// Returns the carrier identifier used in quotes, errors and events.
    fn id(&self) -> &CarrierId;

    /// Fetches rate quotes for the request.
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError`]; lower-level transport and decode failures must
    /// already be translated into the taxonomy.
    fn rates<'a>(&'a self, request: &'a RateRequest) -> RateFuture<'a>;
}
