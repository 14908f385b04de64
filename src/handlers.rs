use crate::{
    AppConfig, NavigatorState,
    error::NavigationError,
    models::{
        HealthResponse, HrefRequest, HrefResponse, NavigateRequest, NavigateResponse,
        NavigationDecision, PageResponse, RouteDescriptor,
    },
    session::{SessionCredentials, USER_ROLE_HEADER},
};
use axum::{
    Json,
    extract::State,
    http::{HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::debug;

// --- Handlers ---

/// health_check
///
/// [Public Route] Liveness probe. Also reports the guard settings this instance
/// runs with, so a lenient seller policy is visible from outside.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_check(State(config): State<AppConfig>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        environment: config.env.as_str().to_string(),
        seller_auto_promote: config.seller_auto_promote,
        legacy_token_key: config.legacy_token_key,
        max_redirects: config.max_redirects,
    })
}

/// list_routes
///
/// [Public Route] The route table in declaration order, for clients that build
/// their navigation from it.
#[utoipa::path(
    get,
    path = "/api/routes",
    responses((status = 200, description = "Route table", body = [RouteDescriptor]))
)]
pub async fn list_routes(State(navigator): State<NavigatorState>) -> Json<Vec<RouteDescriptor>> {
    Json(navigator.table().routes().to_vec())
}

/// build_href
///
/// [Public Route] Turns a route name plus `:name` values into a concrete path.
#[utoipa::path(
    post,
    path = "/api/routes/href",
    request_body = HrefRequest,
    responses(
        (status = 200, description = "Concrete path", body = HrefResponse),
        (status = 400, description = "Missing path parameter"),
        (status = 404, description = "Unknown route name")
    )
)]
pub async fn build_href(
    State(navigator): State<NavigatorState>,
    Json(payload): Json<HrefRequest>,
) -> Result<Json<HrefResponse>, StatusCode> {
    navigator
        .table()
        .href(&payload.name, &payload.params)
        .map(|path| Json(HrefResponse { path }))
        .map_err(|e| e.status_code())
}

/// navigate
///
/// [Public Route] Runs the guard for a path with the credentials carried in the
/// body, following redirects to the final location.
///
/// Denials are reported as `decision = "redirect"` with a 200, not as errors.
/// `role_changed` tells the caller to persist the returned `role`.
#[utoipa::path(
    post,
    path = "/api/navigate",
    request_body = NavigateRequest,
    responses(
        (status = 200, description = "Navigation outcome", body = NavigateResponse),
        (status = 404, description = "No route matches the path"),
        (status = 508, description = "Redirect loop")
    )
)]
pub async fn navigate(
    State(navigator): State<NavigatorState>,
    Json(payload): Json<NavigateRequest>,
) -> Result<Json<NavigateResponse>, StatusCode> {
    let mut credentials = SessionCredentials::from_raw(payload.token, payload.role.as_deref());

    let resolution = navigator
        .resolve(&payload.path, &mut credentials)
        .map_err(|e| {
            debug!(error = %e, "navigation failed");
            e.status_code()
        })?;

    let decision = if resolution.was_redirected() {
        NavigationDecision::Redirect
    } else {
        NavigationDecision::Allow
    };

    Ok(Json(NavigateResponse {
        decision,
        requested_path: resolution.requested_path,
        location: resolution.path,
        route: resolution.route.clone(),
        params: resolution.params,
        redirects: resolution.redirects.len(),
        role: credentials.role,
        role_changed: resolution.role_changed,
        evaluated_at: Utc::now(),
    }))
}

/// serve_page
///
/// [Fallback] The page gate. Every path not claimed by the API is treated as a
/// page visit: credentials come from the `Authorization` and `x-user-role`
/// headers, and the visitor either gets the page descriptor or a 307 to where
/// the guard sends them.
///
/// When navigation changed the role, the new value is echoed in `x-user-role` so
/// the client can store it. A redirect chain that loops still sends the visitor
/// to the guard's first redirect when that leads elsewhere; only a loop on the
/// requested route itself is answered with 508.
pub async fn serve_page(
    State(navigator): State<NavigatorState>,
    method: Method,
    mut credentials: SessionCredentials,
    uri: Uri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let resolution = match navigator.resolve(uri.path(), &mut credentials) {
        Ok(resolution) => resolution,
        Err(NavigationError::RedirectLoop {
            first_hop: Some(target),
            hops,
            ..
        }) => {
            debug!(hops, location = target.path(), "redirect loop, sending visitor to first hop");
            return Redirect::temporary(target.path()).into_response();
        }
        Err(e) => {
            debug!(error = %e, "page gate rejected request");
            return e.status_code().into_response();
        }
    };

    let mut response = if resolution.was_redirected() {
        Redirect::temporary(&resolution.path).into_response()
    } else {
        Json(PageResponse {
            name: resolution.route.name.clone(),
            view: resolution.route.view.clone(),
            path: resolution.path,
            params: resolution.params,
        })
        .into_response()
    };

    if resolution.role_changed {
        if let Some(role) = credentials.role {
            response
                .headers_mut()
                .insert(USER_ROLE_HEADER, HeaderValue::from_static(role.as_str()));
        }
    }

    response
}
