// Path: crates/crypto/src/credentials/mod.rs
//! The credential bundle and the verifier built from it.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH};
use vproxy_types::error::{AuthError, ErrorCode};

use crate::issuer::{CredentialRequest, IssuerClient};

/// A message signed by the issuer for this proxy instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    message: Vec<u8>,
    signature: Signature,
}

impl CredentialBundle {
    /// Builds a bundle from a message and a raw 64-byte Ed25519 signature.
    pub fn new(message: impl Into<Vec<u8>>, signature: &[u8]) -> Result<Self, AuthError> {
        let signature = Signature::from_slice(signature)
            .map_err(|e| AuthError::MalformedBundle(format!("bad signature bytes: {}", e)))?;
        Ok(Self {
            message: message.into(),
            signature,
        })
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }
}

#[derive(Debug)]
enum VerifierState {
    Ready(CredentialBundle),
    Unavailable(String),
}

/// Immutable caller-token verifier. Safe to share across request tasks
/// without synchronization.
#[derive(Debug)]
pub struct CredentialVerifier {
    state: VerifierState,
}

impl CredentialVerifier {
    pub fn new(bundle: CredentialBundle) -> Self {
        Self {
            state: VerifierState::Ready(bundle),
        }
    }

    /// A verifier that rejects every token, used when no bundle could be obtained.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: VerifierState::Unavailable(reason.into()),
        }
    }

    /// Fetches the bundle from the issuer. Any failure is logged and yields a
    /// permanently failing verifier rather than an error.
    pub async fn initialize(issuer: &IssuerClient, request: &CredentialRequest) -> Self {
        match issuer.fetch(request).await {
            Ok(bundle) => {
                tracing::info!(target: "credentials", uid = request.uid, "credential bundle obtained");
                Self::new(bundle)
            }
            Err(e) => {
                tracing::warn!(
                    target: "credentials",
                    code = e.code(),
                    error = %e,
                    "could not obtain credentials; every caller will be rejected"
                );
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, VerifierState::Ready(_))
    }

    /// Checks that `token`, read as an Ed25519 public key, verifies the
    /// issuer's signature over the stored message. Pure: the same token always
    /// yields the same result.
    pub fn verify(&self, token: &[u8]) -> Result<(), AuthError> {
        let bundle = match &self.state {
            VerifierState::Ready(bundle) => bundle,
            VerifierState::Unavailable(reason) => {
                return Err(AuthError::Unavailable(reason.clone()))
            }
        };
        let key_bytes: [u8; PUBLIC_KEY_LENGTH] = token.try_into().map_err(|_| {
            AuthError::InvalidKey(format!(
                "expected {} bytes, got {}",
                PUBLIC_KEY_LENGTH,
                token.len()
            ))
        })?;
        let key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        key.verify(&bundle.message, &bundle.signature)
            .map_err(|_| AuthError::SignatureMismatch)
    }

    /// Authenticates the raw `Authorization` header value: base64 of the
    /// public key, optionally behind a `Bearer` scheme in any case.
    pub fn verify_header(&self, header: Option<&str>) -> Result<(), AuthError> {
        let raw = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::MissingHeader)?;
        let encoded = match raw.split_once(char::is_whitespace) {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            _ => raw,
        };
        let token = BASE64
            .decode(encoded)
            .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        self.verify(&token)
    }
}

#[cfg(test)]
mod tests;
