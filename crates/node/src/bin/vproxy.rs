// Path: crates/node/src/bin/vproxy.rs
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

use anyhow::{anyhow, Result};
use clap::Parser;
use http_proxy_gateway::{
    preprocess::ImagePreprocessor, ForwardSettings, GatewayConfig, GatewayState,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use vproxy_api::{WorkerRegistry, WorkerTransport};
use vproxy_client::{HttpWorkerTransport, SnapshotRegistry};
use vproxy_crypto::{CredentialRequest, CredentialVerifier, IssuerClient};
use vproxy_storage::CounterStore;
use vproxy_telemetry::http::ReadinessCheck;
use vproxy_types::config::ProxyConfig;

#[derive(Parser, Debug)]
#[clap(name = "vproxy", about = "Authenticated validator proxy for inference workers")]
struct ProxyOpts {
    #[clap(
        long,
        env = "VPROXY_CONFIG",
        default_value = "vproxy.toml",
        help = "Path to the vproxy.toml configuration file."
    )]
    config: PathBuf,
}

fn load_config(path: &Path) -> Result<ProxyConfig> {
    let config: ProxyConfig = toml::from_str(&fs::read_to_string(path)?)?;
    config
        .validate()
        .map_err(|e| anyhow!("invalid config {}: {}", path.display(), e))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing FIRST
    vproxy_telemetry::init::init_tracing()?;
    let metrics_sink = vproxy_telemetry::prometheus::install()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let telemetry_addr_str =
        std::env::var("TELEMETRY_ADDR").unwrap_or_else(|_| "127.0.0.1:9615".to_string());
    let telemetry_addr: std::net::SocketAddr = telemetry_addr_str.parse()?;

    let opts = ProxyOpts::parse();
    tracing::info!(target: "node", event = "startup", config = %opts.config.display());
    let config = load_config(&opts.config)?;

    // 2. Worker registry, refreshed from the scoring loop's snapshot.
    let registry = Arc::new(SnapshotRegistry::load(&config.registry.snapshot_path)?);
    tracing::info!(
        target: "node",
        workers = registry.len(),
        snapshot = %config.registry.snapshot_path.display(),
        "worker registry loaded"
    );
    let refresh = Arc::clone(&registry).spawn_refresh(
        config.registry.snapshot_path.clone(),
        std::time::Duration::from_secs(config.registry.refresh_secs),
        shutdown_rx.clone(),
    );

    // 3. Persisted success/failure counters.
    let counters = Arc::new(CounterStore::open(config.storage.counter_path.clone())?);
    let initial = counters.snapshot();
    metrics_sink.set_counter_state(initial.success_count, initial.failure_count);

    // 4. One-shot credential fetch. A failure leaves the gateway rejecting every request.
    let issuer = IssuerClient::new(config.issuer.url.clone(), config.issuer.timeout())?;
    let request = CredentialRequest {
        postfix: config.issuer.postfix(),
        uid: config.issuer.uid,
    };
    let verifier = Arc::new(CredentialVerifier::initialize(&issuer, &request).await);
    tracing::info!(target: "node", ready = verifier.is_ready(), "credential verifier initialized");

    // 5. Gateway wiring.
    let registry: Arc<dyn WorkerRegistry> = registry;
    let transport: Arc<dyn WorkerTransport> = Arc::new(HttpWorkerTransport::new(
        Arc::clone(&registry),
        config.dispatch.worker_path.clone(),
        config.dispatch.timeout(),
    )?);
    let state = Arc::new(GatewayState::new(
        verifier,
        registry,
        transport,
        counters,
        ImagePreprocessor::new(config.preprocess.image_size),
        ForwardSettings {
            sample_size: config.dispatch.sample_size,
            dispatch_timeout: config.dispatch.timeout(),
            request_timeout: config.server.request_timeout(),
            fqdn: config.server.resolve_fqdn(),
        },
    ));
    // 6. Telemetry server; /readyz reflects the gateway's credentials and registry.
    let readiness: Arc<dyn ReadinessCheck> = state.clone();
    tokio::spawn(vproxy_telemetry::http::run_server(
        telemetry_addr,
        readiness,
        shutdown_rx.clone(),
    ));

    let gateway_config = GatewayConfig {
        listen_addr: config.server.listen_address.clone(),
        body_limit_kb: config.server.body_limit_kb,
        concurrency_limit: config.server.concurrency_limit,
        request_timeout: config.server.request_timeout(),
    };
    let gateway = tokio::spawn(http_proxy_gateway::run_server(
        gateway_config,
        state,
        shutdown_rx,
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "node", error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!(target: "node", event = "shutdown", reason = "ctrl-c");
    shutdown_tx.send(true).ok();

    match gateway.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(target: "node", error = %e, "gateway exited with error"),
        Err(e) => tracing::error!(target: "node", error = %e, "gateway task failed"),
    }
    refresh.await.ok();

    tracing::info!(target: "node", event = "shutdown", reason = "complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_validates_a_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
fqdn = "proxy.example"

[issuer]
url = "https://issuer.example"
uid = 3
public_port = 10913
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.resolve_fqdn(), "proxy.example");
        assert_eq!(config.issuer.postfix(), ":10913/validator_proxy");
    }

    #[test]
    fn rejects_an_invalid_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dispatch]\nsample_size = 0\n").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
