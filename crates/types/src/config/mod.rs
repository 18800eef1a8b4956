// Path: crates/types/src/config/mod.rs
//! Configuration structures for the validator proxy (`vproxy.toml`).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// The top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub issuer: IssuerConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
}

impl ProxyConfig {
    /// Rejects values the proxy cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.url.trim().is_empty() {
            return Err(ConfigError::Invalid("issuer.url must not be empty".into()));
        }
        if self.dispatch.sample_size == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.sample_size must be at least 1".into(),
            ));
        }
        if self.dispatch.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.timeout_secs must be at least 1".into(),
            ));
        }
        if self.server.request_timeout_secs <= self.dispatch.timeout_secs {
            return Err(ConfigError::Invalid(format!(
                "server.request_timeout_secs ({}) must exceed dispatch.timeout_secs ({})",
                self.server.request_timeout_secs, self.dispatch.timeout_secs
            )));
        }
        if self.server.concurrency_limit == 0 {
            return Err(ConfigError::Invalid(
                "server.concurrency_limit must be at least 1".into(),
            ));
        }
        if self.registry.refresh_secs == 0 {
            return Err(ConfigError::Invalid(
                "registry.refresh_secs must be at least 1".into(),
            ));
        }
        if self.preprocess.image_size == 0 {
            return Err(ConfigError::Invalid(
                "preprocess.image_size must be at least 1".into(),
            ));
        }
        if !self.dispatch.worker_path.starts_with('/') {
            return Err(ConfigError::Invalid(
                "dispatch.worker_path must start with '/'".into(),
            ));
        }
        Ok(())
    }
}

/// The public-facing HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Host name reported in responses. Falls back to `$HOSTNAME`, then `localhost`.
    #[serde(default)]
    pub fqdn: Option<String>,
    #[serde(default = "default_body_limit_kb")]
    pub body_limit_kb: usize,
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// Outer bound on a whole request. Must exceed the dispatch deadline.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            fqdn: None,
            body_limit_kb: default_body_limit_kb(),
            concurrency_limit: default_concurrency_limit(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The configured name, else `HOSTNAME`, else the OS host name.
    pub fn resolve_fqdn(&self) -> String {
        pick_fqdn([
            self.fqdn.clone(),
            std::env::var("HOSTNAME").ok(),
            gethostname::gethostname().into_string().ok(),
        ])
    }
}

/// First non-blank candidate, or `localhost`.
fn pick_fqdn<const N: usize>(candidates: [Option<String>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// The trusted service that issues this proxy's credential bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    #[serde(default)]
    pub url: String,
    /// This proxy's instance id as known to the issuer.
    #[serde(default)]
    pub uid: u16,
    /// Externally reachable port of this proxy, if it is exposed.
    #[serde(default)]
    pub public_port: Option<u16>,
    #[serde(default = "default_issuer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            uid: 0,
            public_port: None,
            timeout_secs: default_issuer_timeout_secs(),
        }
    }
}

impl IssuerConfig {
    /// The network-reachable suffix the issuer binds the credential to.
    pub fn postfix(&self) -> String {
        match self.public_port {
            Some(port) => format!(":{}/validator_proxy", port),
            None => String::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fan-out parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Size of the random fallback sample.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Shared deadline for all worker calls of one request.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub timeout_secs: u64,
    /// Path appended to a worker's endpoint for classification calls.
    #[serde(default = "default_worker_path")]
    pub worker_path: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            timeout_secs: default_dispatch_timeout_secs(),
            worker_path: default_worker_path(),
        }
    }
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where the scoring loop publishes the worker table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            refresh_secs: default_refresh_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_counter_path")]
    pub counter_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            counter_path: default_counter_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Side length of the square image sent to workers.
    #[serde(default = "default_image_size")]
    pub image_size: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            image_size: default_image_size(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:10913".to_string()
}
fn default_body_limit_kb() -> usize {
    10 * 1024
}
fn default_concurrency_limit() -> usize {
    64
}
fn default_request_timeout_secs() -> u64 {
    12
}
fn default_issuer_timeout_secs() -> u64 {
    30
}
fn default_sample_size() -> usize {
    50
}
fn default_dispatch_timeout_secs() -> u64 {
    9
}
fn default_worker_path() -> String {
    "/classify".to_string()
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("workers.json")
}
fn default_refresh_secs() -> u64 {
    30
}
fn default_counter_path() -> PathBuf {
    PathBuf::from("proxy_counter.json")
}
fn default_image_size() -> u32 {
    256
}
