// Path: crates/client/src/registry.rs
//! A worker registry backed by a JSON snapshot file.
//!
//! The scoring loop owns the file and rewrites it after each round; this
//! process only reads it, once at startup and then on a fixed interval.

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vproxy_api::WorkerRegistry;
use vproxy_types::app::{WorkerId, WorkerInfo};
use vproxy_types::error::{ErrorCode, RegistryError};

/// The on-disk registry document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub workers: Vec<WorkerInfo>,
    #[serde(default)]
    pub last_responsive: Vec<WorkerId>,
}

#[derive(Default)]
struct Indexed {
    workers: HashMap<WorkerId, WorkerInfo>,
    serving: Vec<WorkerId>,
    last_responsive: Vec<WorkerId>,
}

impl From<RegistrySnapshot> for Indexed {
    fn from(snapshot: RegistrySnapshot) -> Self {
        let mut serving: Vec<WorkerId> = snapshot
            .workers
            .iter()
            .filter(|w| w.serving)
            .map(|w| w.uid)
            .collect();
        serving.sort_unstable();
        serving.dedup();
        let workers: HashMap<WorkerId, WorkerInfo> =
            snapshot.workers.into_iter().map(|w| (w.uid, w)).collect();
        let last_responsive = snapshot
            .last_responsive
            .into_iter()
            .filter(|id| workers.contains_key(id))
            .collect();
        Self {
            workers,
            serving,
            last_responsive,
        }
    }
}

pub struct SnapshotRegistry {
    inner: RwLock<Indexed>,
}

impl SnapshotRegistry {
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot.into()),
        }
    }

    /// Reads the snapshot at `path`. A missing file yields an empty registry
    /// so the proxy can start before the scoring loop has published anything.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Self::new(parse(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(target: "registry", path = %path.display(), "no registry snapshot yet; starting empty");
                Ok(Self::new(RegistrySnapshot::default()))
            }
            Err(e) => Err(RegistryError::Io(e.to_string())),
        }
    }

    /// Swaps in a new snapshot atomically with respect to readers.
    pub fn replace(&self, snapshot: RegistrySnapshot) {
        *self.inner.write() = snapshot.into();
    }

    /// Re-reads `path`. On failure the current snapshot is kept.
    pub async fn reload(&self, path: &Path) -> Result<usize, RegistryError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RegistryError::Io(e.to_string()))?;
        let snapshot = parse(&bytes)?;
        let count = snapshot.workers.len();
        self.replace(snapshot);
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.inner.read().workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reloads the snapshot every `every` until `shutdown` changes.
    pub fn spawn_refresh(
        self: Arc<Self>,
        path: PathBuf,
        every: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately; the startup load already ran.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.reload(&path).await {
                            Ok(count) => tracing::debug!(target: "registry", workers = count, "registry snapshot reloaded"),
                            Err(e) => tracing::warn!(
                                target: "registry",
                                code = e.code(),
                                error = %e,
                                "registry reload failed; keeping previous snapshot"
                            ),
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }
}

fn parse(bytes: &[u8]) -> Result<RegistrySnapshot, RegistryError> {
    serde_json::from_slice(bytes).map_err(|e| RegistryError::Parse(e.to_string()))
}

impl WorkerRegistry for SnapshotRegistry {
    fn last_responsive(&self) -> Vec<WorkerId> {
        self.inner.read().last_responsive.clone()
    }

    fn random_sample(&self, k: usize) -> Vec<WorkerId> {
        let inner = self.inner.read();
        inner
            .serving
            .choose_multiple(&mut rand::thread_rng(), k)
            .copied()
            .collect()
    }

    fn worker(&self, id: WorkerId) -> Option<WorkerInfo> {
        self.inner.read().workers.get(&id).cloned()
    }
}
