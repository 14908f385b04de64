use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Navigation Router Module
///
/// Exposes the guard to clients that hold the session themselves and pass it in
/// the request body. Page visits that carry credentials in headers are handled
/// by the page gate fallback instead (see `create_router`).
pub fn navigation_routes() -> Router<AppState> {
    Router::new()
        // POST /api/navigate
        // Evaluates a navigation attempt and reports the final location.
        .route("/api/navigate", post(handlers::navigate))
}
