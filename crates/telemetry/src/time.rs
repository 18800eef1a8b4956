// Path: crates/telemetry/src/time.rs
use crate::sinks::GatewayMetricsSink;
use std::time::Instant;

/// Observes the request duration for `route` when dropped.
pub struct Timer<'a> {
    sink: &'a dyn GatewayMetricsSink,
    route: &'static str,
    start: Instant,
}

impl<'a> Timer<'a> {
    pub fn new(sink: &'a dyn GatewayMetricsSink, route: &'static str) -> Self {
        Self {
            sink,
            route,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_request_duration(self.route, self.start.elapsed().as_secs_f64());
    }
}
