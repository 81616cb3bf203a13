//! Cart provider scope.
//!
//! A cart is only reachable from code running inside [`provide_cart`]. The
//! cart middleware wraps every cart route in a scope, and the CLI wraps each
//! cart command in one. Asking for the cart anywhere else is a wiring bug,
//! reported as a [`ScopeError`].

use std::future::Future;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::store::CartHandle;

tokio::task_local! {
    static CURRENT_CART: CartHandle;
}

/// The cart was requested outside of a provider scope.
#[derive(Debug, Clone, Copy, Error)]
#[error("cart accessed outside of a cart provider scope")]
pub struct ScopeError;

/// Run `future` with `cart` as the current cart.
pub async fn provide_cart<F: Future>(cart: CartHandle, future: F) -> F::Output {
    CURRENT_CART.scope(cart, future).await
}

/// Get the current cart.
///
/// # Errors
///
/// Returns [`ScopeError`] when called outside [`provide_cart`].
pub fn use_cart() -> Result<CartHandle, ScopeError> {
    CURRENT_CART.try_with(CartHandle::clone).map_err(|_| ScopeError)
}

impl IntoResponse for ScopeError {
    fn into_response(self) -> Response {
        let event_id = sentry::capture_error(&self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Cart route is not wrapped by the cart provider middleware"
        );

        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

/// Extract the current cart in a handler.
///
/// # Example
///
/// ```rust,ignore
/// async fn count(cart: CartHandle) -> String {
///     cart.total_items().to_string()
/// }
/// ```
impl<S> FromRequestParts<S> for CartHandle
where
    S: Send + Sync,
{
    type Rejection = ScopeError;

    async fn from_request_parts(_parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        use_cart()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::storage::CartStorage;
    use crate::cart::stores::MemoryStore;

    #[tokio::test]
    async fn test_use_cart_outside_scope_fails() {
        assert!(use_cart().is_err());
    }

    #[tokio::test]
    async fn test_use_cart_inside_scope_returns_provided_cart() {
        let cart = CartHandle::mount(CartStorage::new(MemoryStore::new()));
        cart.ready().await;

        let len = provide_cart(cart.clone(), async {
            let inner = use_cart().unwrap();
            inner.clear_cart();
            inner.len()
        })
        .await;

        assert_eq!(len, 0);
        assert!(use_cart().is_err());
    }

    #[test]
    fn test_scope_error_display() {
        assert_eq!(
            ScopeError.to_string(),
            "cart accessed outside of a cart provider scope"
        );
    }
}
