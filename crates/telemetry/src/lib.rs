// Path: crates/telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Validator Proxy Telemetry
//!
//! Observability for the validator proxy: structured logging initialization,
//! a Prometheus metrics endpoint, and an abstract sink so the gateway does not
//! depend on the metrics backend.

/// The `/metrics`, `/healthz` and `/readyz` server, with a pluggable readiness check.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of the metrics sink using the `prometheus` crate.
pub mod prometheus;
/// The abstract `GatewayMetricsSink` trait and its global accessor.
pub mod sinks;
/// A simple RAII timer for measuring the duration of a request.
pub mod time;

pub use sinks::gateway_metrics;
