// Path: crates/api/src/lib.rs
#![forbid(unsafe_code)]

//! # Validator Proxy API
//!
//! Traits at the two seams the gateway depends on but does not implement:
//! reaching a worker, and knowing which workers exist.

/// The worker registry maintained by the external scoring loop.
pub mod registry;
/// The outbound call to a single inference worker.
pub mod transport;

pub use registry::WorkerRegistry;
pub use transport::{ClassifyPayload, WorkerTransport};
