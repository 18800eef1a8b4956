// Path: crates/http-proxy-gateway/src/lib.rs
#![forbid(unsafe_code)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]

pub mod aggregate;
pub mod dispatcher;
pub mod preprocess;

use aggregate::{aggregate, ForwardResponse};
use anyhow::Result;
use axum::{
    body::{Body, Bytes},
    error_handling::HandleErrorLayer,
    extract::{DefaultBodyLimit, State},
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use dispatcher::Dispatcher;
use preprocess::ImagePreprocessor;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::watch;
use tower::{
    limit::ConcurrencyLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer, BoxError,
    ServiceBuilder,
};
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use vproxy_api::{ClassifyPayload, WorkerRegistry, WorkerTransport};
use vproxy_crypto::CredentialVerifier;
use vproxy_storage::CounterStore;
use vproxy_telemetry::{gateway_metrics, http::ReadinessCheck, time::Timer};
use vproxy_types::app::{RequestOutcome, WorkerId};
use vproxy_types::error::{AuthError, DecodeError, StorageError};
use vproxy_types::ErrorCode;

pub const FORWARD_ROUTE: &str = "/validator_proxy";
pub const LIVENESS_ROUTE: &str = "/health/liveness";

const SEED_MAX: u64 = 1_000_000_000;
/// Time reserved after the fan-out for aggregation and the counter save.
const RESPONSE_MARGIN: Duration = Duration::from_millis(250);

// --- Error Handling ---
#[derive(Debug)]
pub enum AppError {
    Unauthorized(AuthError),
    BadRequest(DecodeError),
    NoValidResponse,
    NoCandidates,
    Internal(anyhow::Error),
}

impl AppError {
    /// The `result` label used for request metrics.
    fn result_label(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::BadRequest(_) => "bad_request",
            AppError::NoValidResponse => "no_valid_response",
            AppError::NoCandidates => "no_candidates",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<DecodeError> for AppError {
    fn from(e: DecodeError) -> Self {
        match e {
            // Re-encoding our own image failing is not the client's fault.
            DecodeError::Encode(_) => AppError::Internal(e.into()),
            other => AppError::BadRequest(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail, code) = match self {
            AppError::Unauthorized(AuthError::MissingHeader) => (
                StatusCode::UNAUTHORIZED,
                "Authorization header missing".to_string(),
                "UNAUTHORIZED",
            ),
            AppError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                "Error getting authentication token".to_string(),
                "UNAUTHORIZED",
            ),
            AppError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.to_string(), e.code()),
            AppError::NoValidResponse => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "No valid response received".to_string(),
                "NO_VALID_RESPONSE",
            ),
            AppError::NoCandidates => (
                StatusCode::SERVICE_UNAVAILABLE,
                "No workers available".to_string(),
                "NO_CANDIDATES",
            ),
            AppError::Internal(e) => {
                tracing::error!(target: "gateway", "Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };
        (
            status,
            Json(serde_json::json!({ "detail": detail, "code": code })),
        )
            .into_response()
    }
}

// --- State ---
/// Per-request knobs that come from configuration.
#[derive(Debug, Clone)]
pub struct ForwardSettings {
    /// Size k of the random fallback sample.
    pub sample_size: usize,
    /// Shared deadline for one fan-out.
    pub dispatch_timeout: Duration,
    /// The outer per-request timeout; the fan-out is clamped to fit inside it.
    pub request_timeout: Duration,
    /// Host name echoed back in every response.
    pub fqdn: String,
}

impl ForwardSettings {
    /// The fan-out deadline for a request that has already spent `elapsed`.
    pub fn dispatch_deadline(&self, elapsed: Duration) -> Duration {
        let remaining = self
            .request_timeout
            .saturating_sub(elapsed)
            .saturating_sub(RESPONSE_MARGIN);
        self.dispatch_timeout.min(remaining)
    }
}

pub struct GatewayState {
    verifier: Arc<CredentialVerifier>,
    registry: Arc<dyn WorkerRegistry>,
    dispatcher: Dispatcher,
    counters: Arc<CounterStore>,
    preprocessor: ImagePreprocessor,
    settings: ForwardSettings,
}

impl GatewayState {
    pub fn new(
        verifier: Arc<CredentialVerifier>,
        registry: Arc<dyn WorkerRegistry>,
        transport: Arc<dyn WorkerTransport>,
        counters: Arc<CounterStore>,
        preprocessor: ImagePreprocessor,
        settings: ForwardSettings,
    ) -> Self {
        Self {
            verifier,
            registry,
            dispatcher: Dispatcher::new(transport),
            counters,
            preprocessor,
            settings,
        }
    }

    /// The last responsive workers if any are known, otherwise a random
    /// sample of the registry.
    fn select_candidates(&self) -> Vec<WorkerId> {
        let responsive = self.registry.last_responsive();
        if !responsive.is_empty() {
            tracing::info!(
                target: "gateway",
                count = responsive.len(),
                "Using last responsive workers"
            );
            return responsive;
        }
        tracing::warn!(
            target: "gateway",
            sample_size = self.settings.sample_size,
            "No recent responsive workers found, sampling random workers"
        );
        self.registry.random_sample(self.settings.sample_size)
    }

    /// Bumps the persisted counter for `outcome`. Persistence failures are
    /// logged and swallowed.
    async fn record(&self, outcome: RequestOutcome) {
        let store = Arc::clone(&self.counters);
        let saved = tokio::task::spawn_blocking(move || store.increment(outcome))
            .await
            .unwrap_or_else(|e| Err(StorageError::Task(e.to_string())));
        match saved {
            Ok(state) => {
                gateway_metrics().set_counter_state(state.success_count, state.failure_count)
            }
            Err(e) => {
                let state = self.counters.snapshot();
                gateway_metrics().set_counter_state(state.success_count, state.failure_count);
                tracing::warn!(
                    target: "gateway",
                    code = e.code(),
                    error = %e,
                    path = %self.counters.path().display(),
                    "Failed to persist proxy counter"
                );
            }
        }
    }
}

impl ReadinessCheck for GatewayState {
    fn unready_reasons(&self) -> Vec<&'static str> {
        let mut reasons = Vec::new();
        if !self.verifier.is_ready() {
            reasons.push("credentials_unavailable");
        }
        if !self.registry.has_candidates() {
            reasons.push("no_workers");
        }
        reasons
    }
}

// --- Request Types ---
#[derive(Deserialize)]
struct RawForwardRequest {
    image: Option<String>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    rich: Option<Value>,
}

#[derive(Debug)]
struct ForwardRequest {
    image: String,
    seed: u64,
    rich: bool,
}

impl ForwardRequest {
    fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let raw: RawForwardRequest =
            serde_json::from_slice(body).map_err(|e| DecodeError::Json(e.to_string()))?;
        let image = raw.image.ok_or(DecodeError::MissingField("image"))?;
        let rich = match raw.rich {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            Some(other) => {
                return Err(DecodeError::Json(format!(
                    "'rich' must be a boolean or \"true\"/\"false\", got {other}"
                )))
            }
        };
        let seed = raw
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen_range(0..=SEED_MAX));
        Ok(Self { image, seed, rich })
    }
}

// --- Middleware ---
async fn auth_middleware(
    State(state): State<Arc<GatewayState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let verdict = match req.headers().get(header::AUTHORIZATION) {
        None => state.verifier.verify_header(None),
        Some(value) => match value.to_str() {
            Ok(token) => state.verifier.verify_header(Some(token)),
            Err(e) => Err(AuthError::MalformedToken(e.to_string())),
        },
    };
    match verdict {
        Ok(()) => {
            tracing::debug!(target: "gateway", "Successfully authenticated token");
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!(
                target: "gateway",
                code = e.code(),
                error = %e,
                path = %req.uri().path(),
                "Authentication failed"
            );
            gateway_metrics().inc_requests(req.uri().path(), "unauthorized");
            AppError::Unauthorized(e).into_response()
        }
    }
}

// Small helper used by HandleErrorLayer to produce structured responses.
async fn map_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(serde_json::json!({ "detail": "request timed out", "code": "TIMEOUT" })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "detail": err.to_string(), "code": "OVERLOADED" })),
        )
    }
}

// --- Handlers ---
async fn forward_handler(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<Json<ForwardResponse>, AppError> {
    let sink = gateway_metrics();
    let _timer = Timer::new(sink, FORWARD_ROUTE);
    let started = Instant::now();
    // Detached so that the outer timeout dropping this handler cannot skip
    // recording the outcome.
    let result = tokio::spawn(async move { forward(&state, &body, started).await })
        .await
        .unwrap_or_else(|e| Err(AppError::Internal(e.into())));
    sink.inc_requests(
        FORWARD_ROUTE,
        match &result {
            Ok(_) => "ok",
            Err(e) => e.result_label(),
        },
    );
    result.map(Json)
}

async fn forward(
    state: &GatewayState,
    body: &[u8],
    started: Instant,
) -> Result<ForwardResponse, AppError> {
    tracing::info!(target: "gateway", "Received an organic request");
    let request = ForwardRequest::decode(body)?;
    let ForwardRequest { image, seed, rich } = request;

    let preprocessor = state.preprocessor;
    let image = tokio::task::spawn_blocking(move || {
        preprocessor
            .preprocess(&image)
            .and_then(|img| img.to_png_base64())
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))??;

    let candidates = state.select_candidates();
    if candidates.is_empty() {
        tracing::warn!(target: "gateway", "Registry holds no workers to query");
        state.record(RequestOutcome::Failure).await;
        return Err(AppError::NoCandidates);
    }

    let payload = Arc::new(ClassifyPayload {
        image,
        seed,
        modality: "image".to_string(),
    });
    let deadline = state.settings.dispatch_deadline(started.elapsed());
    tracing::debug!(
        target: "gateway",
        count = candidates.len(),
        seed,
        deadline_ms = deadline.as_millis() as u64,
        "Querying workers"
    );
    let results = state.dispatcher.dispatch(payload, &candidates, deadline).await;

    match aggregate(&results, &state.settings.fqdn, rich, state.registry.as_ref()) {
        Some(response) => {
            tracing::info!(
                target: "gateway",
                valid = response.preds().len(),
                total = results.len(),
                "Received valid worker responses"
            );
            state.record(RequestOutcome::Success).await;
            Ok(response)
        }
        None => {
            tracing::info!(
                target: "gateway",
                valid = 0,
                total = results.len(),
                "No valid worker response"
            );
            state.record(RequestOutcome::Failure).await;
            Err(AppError::NoValidResponse)
        }
    }
}

async fn liveness_handler() -> Json<Value> {
    gateway_metrics().inc_requests(LIVENESS_ROUTE, "ok");
    Json(serde_json::json!({ "status": "healthy" }))
}

// --- Server ---
pub struct GatewayConfig {
    pub listen_addr: String,
    pub body_limit_kb: usize,
    pub concurrency_limit: usize,
    pub request_timeout: Duration,
}

/// Builds the authenticated router. Both routes sit behind the token check.
pub fn router(state: Arc<GatewayState>, config: &GatewayConfig) -> Router {
    Router::new()
        .route(FORWARD_ROUTE, post(forward_handler))
        .route(LIVENESS_ROUTE, get(liveness_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        // Apply layers. The order is important.
        // `HandleErrorLayer` must wrap the fallible layers to make the service infallible.
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(map_middleware_error))
                .layer(LoadShedLayer::new())
                .layer(ConcurrencyLimitLayer::new(config.concurrency_limit))
                .layer(TimeoutLayer::new(config.request_timeout)),
        )
        // These layers are infallible and can be applied outside the error-handling wrapper.
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        // The tower-http limit below replaces axum's 2 MiB extractor default.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.body_limit_kb * 1024))
}

pub async fn run_server(
    config: GatewayConfig,
    state: Arc<GatewayState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let app = router(state, &config);

    let addr: SocketAddr = config.listen_addr.parse()?;
    tracing::info!(target: "gateway", "Validator proxy listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_rx.changed().await.ok();
            tracing::info!(target: "gateway", "shutting down gracefully");
        },
    );

    if let Err(e) = server.await {
        tracing::error!(target: "gateway", error = %e, "server error");
    }

    Ok(())
}
