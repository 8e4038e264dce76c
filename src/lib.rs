use axum::{Router, http::HeaderName};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Module tree composition: the contract and the registry that walks it.
pub mod module;
pub mod registry;

// Host capabilities the modules plug into.
pub mod app;
pub mod auth;
pub mod config;
pub mod hooks;
pub mod routes;

pub mod error;
pub mod path;

// --- Public Re-exports ---

pub use app::{App, ServeEvent};
pub use config::{AppConfig, Env};
pub use error::{Error, Result};
pub use hooks::{AppHooks, Hook, HookEvent, HookPoint, TaggedHook};
pub use module::{Module, ModuleGroup, ParentModule};
pub use registry::{Lifecycle, ModuleRegistry};
pub use routes::{ApiRouter, Requirement, RouteGroup, RouteGroups, RouteInfo};

/// create_router
///
/// Wraps the routing tree built from the mounted modules with the observability stack:
/// request ids, request tracing and CORS.
pub fn create_router(api: Router) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Observability and Correlation Layers (outermost first)
    api.layer(
        ServiceBuilder::new()
            // 2a. Request ID Generation: a fresh UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // 2b. Request Tracing: one span per request, carrying the generated id.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // 2c. Request ID Propagation: echoes x-request-id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
    // 3. CORS Layer (applied last)
    .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span with method, URI and the `x-request-id` set by the
/// request-id layer, so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
