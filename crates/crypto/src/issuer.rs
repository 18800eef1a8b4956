// Path: crates/crypto/src/issuer.rs
//! Client for the trusted credential issuer.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vproxy_types::error::AuthError;

use crate::credentials::CredentialBundle;

/// Identifies this proxy instance to the issuer.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialRequest {
    /// Network-reachable suffix, e.g. `:10913/validator_proxy`, or empty.
    pub postfix: String,
    pub uid: u16,
}

#[derive(Deserialize)]
struct IssuedCredential {
    message: String,
    /// Base64 of the raw Ed25519 signature.
    signature: String,
}

pub struct IssuerClient {
    client: Client,
    base_url: String,
}

impl IssuerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::IssuerUnreachable(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/credentials/get", self.base_url.trim_end_matches('/'))
    }

    /// Requests the signed bundle for this instance. One attempt, no retries.
    pub async fn fetch(&self, request: &CredentialRequest) -> Result<CredentialBundle, AuthError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .map_err(|e| AuthError::IssuerUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(AuthError::IssuerRejected {
                status: status.as_u16(),
                detail,
            });
        }

        let issued: IssuedCredential = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedBundle(e.to_string()))?;
        let signature = BASE64
            .decode(issued.signature.trim())
            .map_err(|e| AuthError::MalformedBundle(format!("signature is not base64: {}", e)))?;
        CredentialBundle::new(issued.message.into_bytes(), &signature)
    }
}
