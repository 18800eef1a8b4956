// Path: crates/crypto/src/lib.rs
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

//! # Validator Proxy Crypto
//!
//! Caller authentication for the validator proxy. A trusted issuer signs a
//! message for this proxy instance once at startup; a caller is authorized
//! when the public key it presents verifies that signature.

pub mod credentials;
pub mod issuer;

pub use credentials::{CredentialBundle, CredentialVerifier};
pub use issuer::{CredentialRequest, IssuerClient};
