// Path: crates/client/src/lib.rs
#![forbid(unsafe_code)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Validator Proxy Client
//!
//! Concrete implementations of the worker-facing seams: an HTTP transport for
//! classification calls and a registry backed by the snapshot file the scoring
//! loop publishes.

pub mod registry;
pub mod transport;

pub use registry::{RegistrySnapshot, SnapshotRegistry};
pub use transport::HttpWorkerTransport;
