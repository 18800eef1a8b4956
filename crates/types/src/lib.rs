// Path: crates/types/src/lib.rs
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

//! # Validator Proxy Types
//!
//! Core data structures shared by every crate of the validator proxy:
//! worker identities and outcomes, the persisted counter record, TOML
//! configuration, and the error taxonomy.

/// Worker identities, dispatch outcomes and the persisted counter record.
pub mod app;
/// TOML configuration structures and their validation.
pub mod config;
/// Error enums with stable machine-readable codes.
pub mod error;

pub use error::ErrorCode;
