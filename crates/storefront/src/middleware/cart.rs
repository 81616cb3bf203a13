//! Cart provider middleware.
//!
//! Mounts the visitor's cart from the request cookies, runs the handler
//! inside a cart scope, then waits for the cart to persist and writes the
//! changed cookie back on the response.

use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use crate::cart::{CartHandle, CartStorage, provide_cart, stores::CookieStore};
use crate::state::AppState;

/// Provide a cart to every handler below this layer.
///
/// Handlers extract it as [`CartHandle`]. Hydration finishes before the
/// handler runs, and every save has landed before the response leaves.
pub async fn cart_provider_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let cookies = CookieStore::from_headers(request.headers());
    let cart = CartHandle::mount(CartStorage::new(cookies.clone()));
    cart.ready().await;

    let span = tracing::debug_span!("cart", items = cart.len());
    let mut response = provide_cart(cart.clone(), next.run(request))
        .instrument(span)
        .await;
    cart.flush().await;

    for value in cookies.take_set_cookie_headers(state.config().secure_cookies()) {
        response.headers_mut().append(SET_COOKIE, value);
    }

    response
}
