// Path: crates/api/src/registry.rs

use vproxy_types::app::{WorkerId, WorkerInfo};

/// Read access to the worker table published by the scoring loop.
///
/// Every method returns fresh data; callers must not cache results across
/// requests.
pub trait WorkerRegistry: Send + Sync {
    /// Workers that answered the most recent scoring round, in the order the
    /// scoring loop queried them.
    fn last_responsive(&self) -> Vec<WorkerId>;

    /// Up to `k` distinct serving workers chosen uniformly at random.
    fn random_sample(&self, k: usize) -> Vec<WorkerId>;

    /// Metadata for one worker, if it is still registered.
    fn worker(&self, id: WorkerId) -> Option<WorkerInfo>;

    /// Whether a request arriving now would have any worker to query.
    fn has_candidates(&self) -> bool {
        !self.last_responsive().is_empty() || !self.random_sample(1).is_empty()
    }
}
