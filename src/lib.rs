use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Navigation core: pure and synchronous.
pub mod guard;
pub mod models;
pub mod navigator;
pub mod route_table;
pub mod session;
pub mod storage;

// Service plumbing.
pub mod config;
pub mod error;
pub mod handlers;

// HTTP route groups.
pub mod routes;
use routes::{navigation, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use guard::{GuardDecision, GuardPolicy, RedirectTarget, RouteGuard};
pub use navigator::{Navigator, Resolution};
pub use route_table::RouteTable;
pub use session::SessionCredentials;
pub use storage::{MemorySessionStorage, SessionStorage};

/// ApiDoc
///
/// OpenAPI document for the JSON endpoints, served at `/api-docs/openapi.json`.
/// The page gate fallback is not listed: it answers any other path.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check, handlers::list_routes, handlers::build_href, handlers::navigate
    ),
    components(
        schemas(
            models::Role, models::RouteMeta, models::RouteDescriptor,
            models::NavigateRequest, models::NavigateResponse, models::NavigationDecision,
            models::HrefRequest, models::HrefResponse, models::PageResponse,
            models::HealthResponse,
        )
    ),
    tags(
        (name = "marketplace-route-gate", description = "Marketplace navigation guard API")
    )
)]
struct ApiDoc;

/// NavigatorState
///
/// Shared handle on the route table and guard.
pub type NavigatorState = Arc<Navigator>;

/// AppState
///
/// Everything a handler needs, cloned cheaply per request.
#[derive(Clone)]
pub struct AppState {
    /// Route table plus guard. Immutable after startup.
    pub navigator: NavigatorState,
    /// Configuration: the loaded, immutable environment configuration. Reported by
    /// `/health`.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(navigator: Navigator, config: AppConfig) -> Self {
        Self {
            navigator: Arc::new(navigator),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for NavigatorState {
    fn from_ref(app_state: &AppState) -> NavigatorState {
        app_state.navigator.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the API route groups and the page gate, then wraps everything in the
/// request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(navigation::navigation_routes())
        // Page Gate: any path the API does not claim is a page visit.
        .fallback(handlers::serve_page)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set by the layer above
/// so every log line of a request can be correlated.
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
