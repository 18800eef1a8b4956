// Path: crates/client/src/transport.rs
//! HTTP transport for classification calls to inference workers.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use vproxy_api::{ClassifyPayload, WorkerRegistry, WorkerTransport};
use vproxy_types::app::WorkerId;
use vproxy_types::error::TransportError;

#[derive(Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    prediction: Option<f64>,
}

/// POSTs the payload as JSON to `<endpoint><worker_path>` of the worker
/// resolved through the registry.
pub struct HttpWorkerTransport {
    client: Client,
    registry: Arc<dyn WorkerRegistry>,
    worker_path: String,
}

impl HttpWorkerTransport {
    /// The client carries only a connect timeout; the overall per-request
    /// deadline is enforced by the dispatcher.
    pub fn new(
        registry: Arc<dyn WorkerRegistry>,
        worker_path: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            client,
            registry,
            worker_path: worker_path.into(),
        })
    }
}

#[async_trait]
impl WorkerTransport for HttpWorkerTransport {
    async fn call(
        &self,
        worker: WorkerId,
        payload: &ClassifyPayload,
    ) -> Result<Option<f64>, TransportError> {
        let info = self
            .registry
            .worker(worker)
            .ok_or(TransportError::UnknownWorker(worker))?;
        let url = format!(
            "{}{}",
            info.endpoint.trim_end_matches('/'),
            self.worker_path
        );

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(body.prediction)
    }
}
