// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sink using the Prometheus crate.

use crate::sinks::{GatewayMetricsSink, SINK};
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram, register_histogram_vec, register_int_counter_vec,
    register_int_gauge_vec, Histogram, HistogramVec, IntCounterVec, IntGaugeVec,
};

static GATEWAY_REQUESTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static GATEWAY_REQUEST_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static WORKER_OUTCOMES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static DISPATCH_DURATION_SECONDS: OnceCell<Histogram> = OnceCell::new();
static PROXY_COUNTER: OnceCell<IntGaugeVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

static PROMETHEUS_SINK: PrometheusSink = PrometheusSink;

// Metrics are only read after `install()` has set every cell, so a missing
// cell means telemetry is off and the observation is dropped.
macro_rules! with_metric {
    ($metric:ident, |$m:ident| $body:expr) => {
        if let Some($m) = $metric.get() {
            $body;
        }
    };
}

impl GatewayMetricsSink for PrometheusSink {
    fn inc_requests(&self, route: &str, result: &str) {
        with_metric!(GATEWAY_REQUESTS_TOTAL, |m| m
            .with_label_values(&[route, result])
            .inc());
    }
    fn observe_request_duration(&self, route: &str, duration_secs: f64) {
        with_metric!(GATEWAY_REQUEST_DURATION_SECONDS, |m| m
            .with_label_values(&[route])
            .observe(duration_secs));
    }
    fn inc_worker_outcome(&self, outcome: &str) {
        with_metric!(WORKER_OUTCOMES_TOTAL, |m| m
            .with_label_values(&[outcome])
            .inc());
    }
    fn observe_dispatch_duration(&self, duration_secs: f64) {
        with_metric!(DISPATCH_DURATION_SECONDS, |m| m.observe(duration_secs));
    }
    fn set_counter_state(&self, success_count: u64, failure_count: u64) {
        with_metric!(PROXY_COUNTER, |m| {
            m.with_label_values(&["success"])
                .set(i64::try_from(success_count).unwrap_or(i64::MAX));
            m.with_label_values(&["failure"])
                .set(i64::try_from(failure_count).unwrap_or(i64::MAX));
        });
    }
}

/// Registers all collectors with the default registry and installs the
/// Prometheus sink as the global sink. Call once at startup.
pub fn install() -> Result<&'static dyn GatewayMetricsSink, anyhow::Error> {
    let buckets = exponential_buckets(0.005, 2.0, 12)?;

    let _ = GATEWAY_REQUESTS_TOTAL.set(register_int_counter_vec!(
        "vproxy_gateway_requests_total",
        "Total HTTP gateway requests",
        &["route", "result"]
    )?);
    let _ = GATEWAY_REQUEST_DURATION_SECONDS.set(register_histogram_vec!(
        "vproxy_gateway_request_duration_seconds",
        "Latency of HTTP gateway requests (seconds)",
        &["route"],
        buckets.clone()
    )?);
    let _ = WORKER_OUTCOMES_TOTAL.set(register_int_counter_vec!(
        "vproxy_worker_outcomes_total",
        "Per-worker dispatch outcomes",
        &["outcome"]
    )?);
    let _ = DISPATCH_DURATION_SECONDS.set(register_histogram!(
        "vproxy_dispatch_duration_seconds",
        "Wall time of one worker fan-out (seconds)",
        buckets
    )?);
    let _ = PROXY_COUNTER.set(register_int_gauge_vec!(
        "vproxy_proxy_counter",
        "Persisted organic request counters",
        &["outcome"]
    )?);

    let sink: &'static dyn GatewayMetricsSink = &PROMETHEUS_SINK;
    SINK.set(sink)
        .map_err(|_| anyhow::anyhow!("metrics sink already installed"))?;
    Ok(sink)
}
