// Path: crates/http-proxy-gateway/src/dispatcher/mod.rs
//! Bounded-wait fan-out of one request to many workers.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use vproxy_api::{ClassifyPayload, WorkerTransport};
use vproxy_telemetry::gateway_metrics;
use vproxy_types::app::{NoAnswer, WorkerId, WorkerOutcome};
use vproxy_types::ErrorCode;

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn WorkerTransport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn WorkerTransport>) -> Self {
        Self { transport }
    }

    /// Calls every candidate concurrently and returns one outcome per
    /// candidate, in candidate order.
    ///
    /// All calls share one deadline measured from the start of this call.
    /// Calls still running at the deadline are aborted and recorded as
    /// [`NoAnswer::Timeout`]; every spawned task has finished by the time
    /// this returns.
    pub async fn dispatch(
        &self,
        payload: Arc<ClassifyPayload>,
        candidates: &[WorkerId],
        deadline: Duration,
    ) -> Vec<(WorkerId, WorkerOutcome)> {
        let started = Instant::now();
        let deadline_at = started + deadline;
        let mut outcomes = vec![WorkerOutcome::NoAnswer(NoAnswer::Timeout); candidates.len()];

        let mut tasks = JoinSet::new();
        for (idx, &worker) in candidates.iter().enumerate() {
            let transport = Arc::clone(&self.transport);
            let payload = Arc::clone(&payload);
            tasks.spawn(async move {
                let outcome = match tokio::time::timeout_at(
                    deadline_at,
                    transport.call(worker, &payload),
                )
                .await
                {
                    Ok(Ok(reported)) => WorkerOutcome::from_reported(reported),
                    Ok(Err(e)) => {
                        tracing::debug!(
                            target: "dispatch",
                            worker = %worker,
                            code = e.code(),
                            error = %e,
                            "worker call failed"
                        );
                        WorkerOutcome::NoAnswer(NoAnswer::Transport)
                    }
                    Err(_) => WorkerOutcome::NoAnswer(NoAnswer::Timeout),
                };
                (idx, outcome)
            });
        }

        loop {
            match tokio::time::timeout_at(deadline_at, tasks.join_next()).await {
                Ok(Some(Ok((idx, outcome)))) => {
                    if let Some(slot) = outcomes.get_mut(idx) {
                        *slot = outcome;
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!(target: "dispatch", error = %e, "worker call task failed");
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::debug!(
                        target: "dispatch",
                        pending = tasks.len(),
                        "dispatch deadline reached; abandoning pending calls"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }
        // Late results are discarded; this only waits for aborted tasks to unwind.
        while tasks.join_next().await.is_some() {}

        let sink = gateway_metrics();
        sink.observe_dispatch_duration(started.elapsed().as_secs_f64());
        for outcome in &outcomes {
            sink.inc_worker_outcome(outcome.label());
        }

        candidates.iter().copied().zip(outcomes).collect()
    }
}

#[cfg(test)]
mod tests;
