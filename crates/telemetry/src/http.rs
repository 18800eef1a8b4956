// Path: crates/telemetry/src/http.rs
use axum::{
    body::Bytes,
    error_handling::HandleErrorLayer,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::watch;
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;

/// Reports whether the process can do useful work yet.
pub trait ReadinessCheck: Send + Sync {
    /// Reasons the process is not ready; empty when it is.
    fn unready_reasons(&self) -> Vec<&'static str>;
}

async fn metrics_handler() -> ([(HeaderName, String); 1], Bytes) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::with_capacity(1 << 16);
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::error!(target: "telemetry", error = %e, "Failed to encode prometheus metrics");
    }
    (
        [(CONTENT_TYPE, encoder.format_type().to_string())],
        buf.into(),
    )
}

async fn healthz_handler() -> &'static str {
    "OK"
}

async fn readyz_handler(State(check): State<Arc<dyn ReadinessCheck>>) -> Response {
    let reasons = check.unready_reasons();
    if reasons.is_empty() {
        return (StatusCode::OK, "OK").into_response();
    }
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "status": "not_ready", "reasons": reasons })),
    )
        .into_response()
}

async fn handle_service_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Telemetry endpoint overloaded: {}", err),
        )
    }
}

fn router(readiness: Arc<dyn ReadinessCheck>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(readiness)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_service_error))
                .layer(TraceLayer::new_for_http())
                .load_shed()
                .concurrency_limit(8)
                .timeout(Duration::from_secs(2)),
        )
}

/// Serves the telemetry endpoints until `shutdown` changes. Bind failures are
/// logged; telemetry is never fatal to the proxy.
pub async fn run_server(
    addr: SocketAddr,
    readiness: Arc<dyn ReadinessCheck>,
    mut shutdown: watch::Receiver<bool>,
) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(target: "telemetry", error = %e, "Failed to bind telemetry http server");
            return;
        }
    };
    tracing::info!(target: "telemetry", addr = %addr, "listening");

    let graceful = axum::serve(listener, router(readiness).into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.changed().await.ok();
            tracing::info!(target: "telemetry", "shutting down gracefully");
        });

    if let Err(e) = graceful.await {
        tracing::error!(target: "telemetry", error = %e, "server error");
    }
}
