//! Cart route handlers.
//!
//! JSON endpoints over the visitor's cookie-backed cart. The cart provider
//! middleware has hydrated the cart before any handler here runs.

use std::num::NonZeroU32;

use axum::{Json, extract::Path};
use brightline_core::{Email, LineItem, LineItemId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cart::CartHandle;
use crate::error::{AppError, Result, add_breadcrumb};

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub total_price: f64,
    pub total_items: u64,
    pub subtotal: String,
}

impl From<&CartHandle> for CartView {
    fn from(cart: &CartHandle) -> Self {
        let total_price = cart.total_price();
        Self {
            items: cart.items(),
            total_price,
            total_items: cart.total_items(),
            subtotal: format_price(total_price),
        }
    }
}

/// Cart count badge data.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartCount {
    pub count: u64,
}

/// Format an amount as a dollar price string.
fn format_price(amount: f64) -> String {
    format!("${amount:.2}")
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub domain: String,
    pub price: f64,
    pub quantity: Option<u32>,
    pub email: String,
}

impl AddItemRequest {
    /// Validate the request into a new line item.
    fn into_line_item(self) -> Result<LineItem> {
        let quantity = NonZeroU32::new(self.quantity.unwrap_or(1))
            .ok_or_else(|| AppError::BadRequest("quantity must be at least 1".to_string()))?;
        let email = Email::parse(&self.email)?;

        Ok(LineItem::new(
            &self.kind,
            &self.domain,
            self.price,
            quantity,
            email.into_inner(),
        )?)
    }
}

/// Display the cart.
#[instrument(skip(cart))]
pub async fn show(cart: CartHandle) -> Json<CartView> {
    Json(CartView::from(&cart))
}

/// Add an item to the cart.
///
/// Merges into an existing item for the same service type and domain.
/// Answers 422 when the cart cookie has no room for another item.
#[instrument(skip_all)]
pub async fn add(cart: CartHandle, Json(request): Json<AddItemRequest>) -> Result<Json<CartView>> {
    let item = request.into_line_item()?;
    let kind = item.kind.clone();
    let domain = item.domain.clone();

    cart.try_add_to_cart(item)?;
    add_breadcrumb(
        "cart",
        "Added line item",
        Some(&[("type", kind.as_str()), ("domain", domain.as_str())]),
    );
    Ok(Json(CartView::from(&cart)))
}

/// Remove an item from the cart. Unknown ids are ignored.
#[instrument(skip(cart))]
pub async fn remove(cart: CartHandle, Path(id): Path<String>) -> Json<CartView> {
    cart.remove_from_cart(&LineItemId::from(id));
    Json(CartView::from(&cart))
}

/// Empty the cart.
#[instrument(skip(cart))]
pub async fn clear(cart: CartHandle) -> Json<CartView> {
    cart.clear_cart();
    Json(CartView::from(&cart))
}

/// Get the cart count badge.
#[instrument(skip(cart))]
pub async fn count(cart: CartHandle) -> Json<CartCount> {
    Json(CartCount {
        count: cart.total_items(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(price: f64, quantity: Option<u32>, email: &str) -> AddItemRequest {
        AddItemRequest {
            kind: "hosting".to_string(),
            domain: "example.com".to_string(),
            price,
            quantity,
            email: email.to_string(),
        }
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.0), "$0.00");
        assert_eq!(format_price(49.5), "$49.50");
        assert_eq!(format_price(1234.567), "$1234.57");
    }

    #[test]
    fn test_into_line_item_defaults_quantity() {
        let item = request(49.0, None, " ops@example.com ").into_line_item().unwrap();
        assert_eq!(item.quantity.get(), 1);
        assert_eq!(item.email, "ops@example.com");
        assert_eq!(item.kind, "hosting");
    }

    #[test]
    fn test_into_line_item_rejects_bad_input() {
        for bad in [
            request(49.0, Some(0), "ops@example.com"),
            request(-1.0, None, "ops@example.com"),
            request(49.0, None, "not-an-email"),
        ] {
            assert!(matches!(bad.into_line_item(), Err(AppError::BadRequest(_))));
        }
    }
}
