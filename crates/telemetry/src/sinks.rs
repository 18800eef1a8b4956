// Path: crates/telemetry/src/sinks.rs
//! Defines the abstract metrics trait, decoupling the gateway from the backend.

use once_cell::sync::OnceCell;

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global sink implementation.
pub static SINK: OnceCell<&'static dyn GatewayMetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns the configured gateway metrics sink, or a no-op sink if none was installed.
pub fn gateway_metrics() -> &'static dyn GatewayMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// A sink for metrics emitted by the HTTP gateway and its dispatcher.
pub trait GatewayMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the request counter for `route`, labelled with its `result`.
    fn inc_requests(&self, route: &str, result: &str);
    /// Observes the end-to-end latency of one request on `route`.
    fn observe_request_duration(&self, route: &str, duration_secs: f64);
    /// Increments the per-worker outcome counter (`valid`, `timeout`, `transport`, `out_of_range`).
    fn inc_worker_outcome(&self, outcome: &str);
    /// Observes the wall time of one fan-out.
    fn observe_dispatch_duration(&self, duration_secs: f64);
    /// Mirrors the persisted success/failure counters.
    fn set_counter_state(&self, success_count: u64, failure_count: u64);
}

impl GatewayMetricsSink for NopSink {
    fn inc_requests(&self, _route: &str, _result: &str) {}
    fn observe_request_duration(&self, _route: &str, _duration_secs: f64) {}
    fn inc_worker_outcome(&self, _outcome: &str) {}
    fn observe_dispatch_duration(&self, _duration_secs: f64) {}
    fn set_counter_state(&self, _success_count: u64, _failure_count: u64) {}
}
