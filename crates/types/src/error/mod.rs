// Path: crates/types/src/error/mod.rs
//! Core error types for the validator proxy.

use crate::app::WorkerId;
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Failures to authenticate a caller, or to obtain the credential bundle that
/// callers are authenticated against.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The request carried no `Authorization` header.
    #[error("Authorization header missing")]
    MissingHeader,
    /// The token was not valid base64 or not valid header text.
    #[error("Malformed token: {0}")]
    MalformedToken(String),
    /// The decoded token is not a usable Ed25519 public key.
    #[error("Invalid public key: {0}")]
    InvalidKey(String),
    /// The stored signature does not verify under the presented key.
    #[error("Signature does not verify under the presented key")]
    SignatureMismatch,
    /// The credential issuer could not be reached.
    #[error("Credential issuer unreachable: {0}")]
    IssuerUnreachable(String),
    /// The credential issuer answered with a non-success status.
    #[error("Credential issuer rejected the request with status {status}: {detail}")]
    IssuerRejected {
        /// HTTP status returned by the issuer.
        status: u16,
        /// Body or reason returned by the issuer.
        detail: String,
    },
    /// The issuer answered, but the bundle could not be parsed.
    #[error("Malformed credential bundle: {0}")]
    MalformedBundle(String),
    /// No credential bundle was obtained at startup; every token is rejected.
    #[error("Credential verifier unavailable: {0}")]
    Unavailable(String),
}

impl ErrorCode for AuthError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingHeader => "AUTH_MISSING_HEADER",
            Self::MalformedToken(_) => "AUTH_MALFORMED_TOKEN",
            Self::InvalidKey(_) => "AUTH_INVALID_KEY",
            Self::SignatureMismatch => "AUTH_SIGNATURE_MISMATCH",
            Self::IssuerUnreachable(_) => "AUTH_ISSUER_UNREACHABLE",
            Self::IssuerRejected { .. } => "AUTH_ISSUER_REJECTED",
            Self::MalformedBundle(_) => "AUTH_MALFORMED_BUNDLE",
            Self::Unavailable(_) => "AUTH_UNAVAILABLE",
        }
    }
}

/// Failures to decode a client payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The body was not a JSON object of the expected shape.
    #[error("Malformed JSON body: {0}")]
    Json(String),
    /// A required field was absent.
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
    /// The image field was not valid base64.
    #[error("Image is not valid base64: {0}")]
    Base64(String),
    /// The image bytes could not be decoded as a supported image format.
    #[error("Image could not be decoded: {0}")]
    Image(String),
    /// The preprocessed image could not be re-encoded for the wire.
    #[error("Image could not be encoded: {0}")]
    Encode(String),
}

impl ErrorCode for DecodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Json(_) => "DECODE_JSON",
            Self::MissingField(_) => "DECODE_MISSING_FIELD",
            Self::Base64(_) => "DECODE_BASE64",
            Self::Image(_) => "DECODE_IMAGE",
            Self::Encode(_) => "DECODE_ENCODE",
        }
    }
}

/// Failures of a single outbound worker call. These never escape the
/// dispatcher; they are folded into a no-answer outcome for that worker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The worker id is not present in the registry.
    #[error("Unknown worker {0}")]
    UnknownWorker(WorkerId),
    /// The request could not be sent or the connection failed.
    #[error("Request to worker failed: {0}")]
    Request(String),
    /// The worker answered with a non-success status.
    #[error("Worker answered with status {0}")]
    Status(u16),
    /// The worker's answer could not be parsed.
    #[error("Worker response could not be decoded: {0}")]
    Decode(String),
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownWorker(_) => "TRANSPORT_UNKNOWN_WORKER",
            Self::Request(_) => "TRANSPORT_REQUEST_FAILED",
            Self::Status(_) => "TRANSPORT_BAD_STATUS",
            Self::Decode(_) => "TRANSPORT_DECODE_FAILED",
        }
    }
}

/// Failures of the durable counter store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the counter file failed.
    #[error("Counter file I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The counter file contents could not be (de)serialized.
    #[error("Counter file serialization error: {0}")]
    Serialization(String),
    /// A background persistence task did not complete.
    #[error("Counter persistence task failed: {0}")]
    Task(String),
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "STORAGE_IO",
            Self::Serialization(_) => "STORAGE_SERIALIZATION",
            Self::Task(_) => "STORAGE_TASK",
        }
    }
}

/// Failures to load a worker registry snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The snapshot file could not be read.
    #[error("Registry snapshot unreadable: {0}")]
    Io(String),
    /// The snapshot file is not a valid registry document.
    #[error("Registry snapshot malformed: {0}")]
    Parse(String),
}

impl ErrorCode for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "REGISTRY_IO",
            Self::Parse(_) => "REGISTRY_PARSE",
        }
    }
}

/// Failures to load or validate configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds a value the proxy cannot run with.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_have_distinct_codes() {
        let errors = [
            AuthError::MissingHeader,
            AuthError::MalformedToken("x".into()),
            AuthError::InvalidKey("x".into()),
            AuthError::SignatureMismatch,
            AuthError::IssuerUnreachable("x".into()),
            AuthError::IssuerRejected {
                status: 403,
                detail: "x".into(),
            },
            AuthError::MalformedBundle("x".into()),
            AuthError::Unavailable("x".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(ErrorCode::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
