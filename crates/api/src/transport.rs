// Path: crates/api/src/transport.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vproxy_types::app::WorkerId;
use vproxy_types::error::TransportError;

/// The typed payload sent to every worker for one classification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyPayload {
    /// Base64 PNG of the preprocessed image.
    pub image: String,
    pub seed: u64,
    pub modality: String,
}

/// A remote-procedure call to a single inference worker.
///
/// Implementations return the raw reported value; `Ok(None)` means the worker
/// answered but declined to predict. Range checking and deadlines are the
/// dispatcher's job, and implementations must not retry.
#[async_trait]
pub trait WorkerTransport: Send + Sync {
    async fn call(
        &self,
        worker: WorkerId,
        payload: &ClassifyPayload,
    ) -> Result<Option<f64>, TransportError>;
}
