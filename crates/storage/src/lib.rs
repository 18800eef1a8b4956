// Path: crates/storage/src/lib.rs
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

//! # Validator Proxy Storage
//!
//! The durable success/failure tally of forwarded requests.

pub mod counter;

pub use counter::CounterStore;
