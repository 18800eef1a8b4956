// Path: crates/telemetry/src/init.rs
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Filter used when neither `VPROXY_LOG` nor `RUST_LOG` is set. HTTP client
/// internals are noisy at `info` under worker fan-out.
pub const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,reqwest=warn,h2=warn,tower_http=info";

/// `VPROXY_LOG`, then `RUST_LOG`, then [`DEFAULT_DIRECTIVES`].
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("VPROXY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs JSON logging on stderr for the `vproxy` binary.
pub fn init_tracing() -> Result<(), anyhow::Error> {
    let fmt_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    let subscriber = Registry::default().with(env_filter()).with(fmt_layer);
    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!(target: "telemetry", "tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVES).is_ok());
    }
}
