//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness check
//! GET    /health/ready           - Readiness check (blob storage reachable)
//!
//! # Cart (JSON, cookie-backed)
//! GET    /cart                   - Cart view
//! DELETE /cart                   - Clear cart
//! POST   /cart/items             - Add line item
//! DELETE /cart/items/{id}        - Remove line item
//! GET    /cart/count             - Cart count badge
//!
//! # Admin API
//! POST   /api/admin/login        - Log in (rate limited)
//! POST   /api/admin/logout       - Log out
//! GET    /api/admin/session      - Session status
//! POST   /api/admin/password     - Rotate password (requires admin)
//! ```

pub mod admin;
pub mod cart;

use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{Request, Response, StatusCode},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::blob::BlobStore;
use crate::middleware::{admin_login_rate_limiter, cart_provider_middleware, create_session_layer};
use crate::state::AppState;

/// Create the cart routes router.
///
/// Every route runs inside the cart provider scope.
pub fn cart_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{id}", delete(cart::remove))
        .route("/count", get(cart::count))
        .route_layer(from_fn_with_state(state.clone(), cart_provider_middleware))
}

/// Create the admin API routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            post(admin::login).route_layer(admin_login_rate_limiter()),
        )
        .route("/logout", post(admin::logout))
        .route("/session", get(admin::session_status))
        .route("/password", post(admin::rotate_password))
}

/// Create all routes for the storefront.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/cart", cart_routes(state))
        .nest("/api/admin", admin_routes())
}

/// Build the full application: routes, sessions and request tracing.
///
/// Sentry layers are added by the binary, which owns the Sentry client.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    routes(&state)
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if blob storage cannot be listed.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.admin_password().blobs().list("admin/").await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Blob storage not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_cart_handler_outside_provider_is_server_error() {
        let router: Router = Router::new().route("/count", get(cart::count));

        let response = router
            .oneshot(Request::builder().uri("/count").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health() {
        let router: Router = Router::new().route("/health", get(health));

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
