// Path: crates/http-proxy-gateway/src/dispatcher/tests.rs
use super::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use vproxy_types::error::TransportError;

type Scripted = (Duration, Result<Option<f64>, TransportError>);

/// Answers each worker after a scripted delay and counts calls still in flight.
#[derive(Default)]
struct ScriptedTransport {
    script: HashMap<WorkerId, Scripted>,
    in_flight: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    fn answer(mut self, id: u16, after_ms: u64, value: Option<f64>) -> Self {
        self.script
            .insert(WorkerId(id), (Duration::from_millis(after_ms), Ok(value)));
        self
    }

    fn fail(mut self, id: u16, after_ms: u64, err: TransportError) -> Self {
        self.script
            .insert(WorkerId(id), (Duration::from_millis(after_ms), Err(err)));
        self
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkerTransport for ScriptedTransport {
    async fn call(
        &self,
        worker: WorkerId,
        _payload: &ClassifyPayload,
    ) -> Result<Option<f64>, TransportError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(Arc::clone(&self.in_flight));
        let Some((delay, result)) = self.script.get(&worker).cloned() else {
            return Err(TransportError::UnknownWorker(worker));
        };
        tokio::time::sleep(delay).await;
        result
    }
}

fn payload() -> Arc<ClassifyPayload> {
    Arc::new(ClassifyPayload {
        image: "aW1n".into(),
        seed: 7,
        modality: "image".into(),
    })
}

fn ids(raw: &[u16]) -> Vec<WorkerId> {
    raw.iter().copied().map(WorkerId).collect()
}

#[tokio::test(start_paused = true)]
async fn slow_worker_is_recorded_as_timeout() {
    let transport = ScriptedTransport::default()
        .answer(1, 100, Some(0.8))
        .answer(2, 60_000, Some(0.9))
        .answer(3, 200, Some(0.2));
    let dispatcher = Dispatcher::new(Arc::new(transport));

    let started = Instant::now();
    let results = dispatcher
        .dispatch(payload(), &ids(&[1, 2, 3]), Duration::from_secs(9))
        .await;

    assert!(started.elapsed() <= Duration::from_secs(9));
    assert_eq!(
        results,
        vec![
            (WorkerId(1), WorkerOutcome::Prediction(0.8)),
            (WorkerId(2), WorkerOutcome::NoAnswer(NoAnswer::Timeout)),
            (WorkerId(3), WorkerOutcome::Prediction(0.2)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn returns_early_when_every_worker_answers() {
    let transport = ScriptedTransport::default()
        .answer(4, 10, Some(0.1))
        .answer(5, 30, Some(0.5));
    let dispatcher = Dispatcher::new(Arc::new(transport));

    let started = Instant::now();
    let results = dispatcher
        .dispatch(payload(), &ids(&[5, 4]), Duration::from_secs(9))
        .await;

    assert!(started.elapsed() < Duration::from_secs(1));
    // Candidate order, not completion order.
    assert_eq!(results[0], (WorkerId(5), WorkerOutcome::Prediction(0.5)));
    assert_eq!(results[1], (WorkerId(4), WorkerOutcome::Prediction(0.1)));
}

#[tokio::test(start_paused = true)]
async fn transport_errors_and_bad_values_are_no_answers() {
    let transport = ScriptedTransport::default()
        .fail(1, 5, TransportError::Status(502))
        .answer(2, 5, None)
        .answer(3, 5, Some(1.7))
        .answer(4, 5, Some(f64::NAN));
    let dispatcher = Dispatcher::new(Arc::new(transport));

    let results = dispatcher
        .dispatch(payload(), &ids(&[1, 2, 3, 4, 99]), Duration::from_secs(9))
        .await;

    let outcomes: Vec<_> = results.into_iter().map(|(_, o)| o).collect();
    assert_eq!(
        outcomes,
        vec![
            WorkerOutcome::NoAnswer(NoAnswer::Transport),
            WorkerOutcome::NoAnswer(NoAnswer::OutOfRange),
            WorkerOutcome::NoAnswer(NoAnswer::OutOfRange),
            WorkerOutcome::NoAnswer(NoAnswer::OutOfRange),
            WorkerOutcome::NoAnswer(NoAnswer::Transport),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn pending_calls_are_cancelled_at_the_deadline() {
    let transport = ScriptedTransport::default()
        .answer(1, 30_000, Some(0.3))
        .answer(2, 40_000, Some(0.4));
    let in_flight = Arc::clone(&transport.in_flight);
    let dispatcher = Dispatcher::new(Arc::new(transport));

    let results = dispatcher
        .dispatch(payload(), &ids(&[1, 2]), Duration::from_secs(9))
        .await;

    assert!(results
        .iter()
        .all(|(_, o)| *o == WorkerOutcome::NoAnswer(NoAnswer::Timeout)));
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_candidate_list_returns_immediately() {
    let dispatcher = Dispatcher::new(Arc::new(ScriptedTransport::default()));
    let results = dispatcher
        .dispatch(payload(), &[], Duration::from_secs(9))
        .await;
    assert!(results.is_empty());
}
