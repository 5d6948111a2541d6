//! # Domain Models
//!
//! Carrier-agnostic types shared by the orchestrator, decorators and adapters.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RateRequest`] | Origin, destination, packages and optional service filter |
//! | [`Address`] | Postal address with 2-letter state and country codes |
//! | [`Package`] | Weight plus optional [`Dimensions`] |
//! | [`ServiceLevel`] | Ground, three-day, two-day or overnight |
//! | [`RateQuote`] | Normalized quote produced by a carrier adapter |
//! | [`CarrierId`] | Validated carrier identifier |
//! | [`Fingerprint`] | Cache key derived from the rate-relevant request fields |
//!
//! `RateRequest` values are built by the caller without validation; the
//! orchestrator runs a [`RequestValidator`](crate::RequestValidator) before any
//! carrier sees them. `RateQuote` and `CarrierId` validate at construction.

mod carrier_id;
mod quote;
mod request;

pub use carrier_id::CarrierId;
pub use quote::{validate_currency_code, RateQuote};
pub use request::{Address, Dimensions, Fingerprint, Package, RateRequest, ServiceLevel};
