use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Read-only endpoints over the route table, plus the health check.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers; reports the guard settings.
        .route("/health", get(handlers::health_check))
        // GET /api/routes
        // The full route table, in declaration order.
        .route("/api/routes", get(handlers::list_routes))
        // POST /api/routes/href
        // Builds a concrete path from a route name and its `:name` values.
        .route("/api/routes/href", post(handlers::build_href))
}
