// Path: crates/storage/src/counter.rs
//! Durable request counters.
//!
//! All mutation goes through [`CounterStore::increment`], which applies the
//! increment and rewrites the file while holding a single lock, so concurrent
//! increments are never lost and saves land on disk in increment order.

use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use vproxy_types::app::{CounterState, RequestOutcome};
use vproxy_types::error::StorageError;

pub struct CounterStore {
    path: PathBuf,
    state: Mutex<CounterState>,
}

impl CounterStore {
    /// Loads the counters at `path`. A missing file starts from zero.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(target: "counter-store", path = %path.display(), "no counter file, starting from zero");
                CounterState::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records one outcome and persists the new state.
    ///
    /// The in-memory increment is kept even when the save fails; the next
    /// successful save carries it. Returns the state after the increment.
    pub fn increment(&self, outcome: RequestOutcome) -> Result<CounterState, StorageError> {
        let mut guard = self.state.lock();
        *guard = guard.record(outcome);
        let snapshot = *guard;
        write_atomic(&self.path, &snapshot)?;
        Ok(snapshot)
    }

    pub fn snapshot(&self) -> CounterState {
        *self.state.lock()
    }
}

// Write to .tmp, sync, rename.
fn write_atomic(path: &Path, state: &CounterState) -> Result<(), StorageError> {
    let bytes =
        serde_json::to_vec_pretty(state).map_err(|e| StorageError::Serialization(e.to_string()))?;

    let mut temp_path = path.to_path_buf();
    if let Some(ext) = path.extension() {
        let mut ext_str = ext.to_os_string();
        ext_str.push(".tmp");
        temp_path.set_extension(ext_str);
    } else {
        temp_path.set_extension("tmp");
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn missing_file_starts_at_zero() {
        let dir = tempdir().unwrap();
        let store = CounterStore::open(dir.path().join("proxy_counter.json")).unwrap();
        assert_eq!(store.snapshot(), CounterState::default());
    }

    #[test]
    fn increments_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proxy_counter.json");
        {
            let store = CounterStore::open(&path).unwrap();
            store.increment(RequestOutcome::Success).unwrap();
            store.increment(RequestOutcome::Success).unwrap();
            let after = store.increment(RequestOutcome::Failure).unwrap();
            assert_eq!(after.success_count, 2);
            assert_eq!(after.failure_count, 1);
        }
        let reopened = CounterStore::open(&path).unwrap();
        assert_eq!(
            reopened.snapshot(),
            CounterState {
                success_count: 2,
                failure_count: 1
            }
        );
        assert!(!dir.path().join("proxy_counter.json.tmp").exists());
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proxy_counter.json");
        let store = Arc::new(CounterStore::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let outcome = if i % 2 == 0 {
                        RequestOutcome::Success
                    } else {
                        RequestOutcome::Failure
                    };
                    for _ in 0..25 {
                        store.increment(outcome).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let expected = CounterState {
            success_count: 100,
            failure_count: 100,
        };
        assert_eq!(store.snapshot(), expected);
        assert_eq!(CounterStore::open(&path).unwrap().snapshot(), expected);
    }

    #[test]
    fn failed_save_keeps_the_increment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("proxy_counter.json");
        let store = CounterStore::open(&path).unwrap();

        assert!(matches!(
            store.increment(RequestOutcome::Failure),
            Err(StorageError::Io(_))
        ));
        assert_eq!(store.snapshot().failure_count, 1);
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proxy_counter.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            CounterStore::open(&path),
            Err(StorageError::Serialization(_))
        ));
    }
}
