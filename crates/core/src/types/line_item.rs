//! Cart line items.
//!
//! A line item is one purchasable unit in a cart: a service package (`type`)
//! for a customer domain, at a unit price, in some quantity. The serialized
//! shape is the client-side storage format, so field names are fixed:
//! `id`, `type`, `price`, `quantity`, `email`, `domain`, `timestamp`.

use std::num::NonZeroU32;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::LineItemId;

/// Errors that can occur when building a [`LineItem`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LineItemError {
    /// The unit price is negative, NaN or infinite.
    #[error("price must be a finite, non-negative number (got {0})")]
    InvalidPrice(f64),
    /// A required text field is blank.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
}

/// One entry in a cart.
///
/// Two items with the same ([`kind`](Self::kind), [`domain`](Self::domain))
/// pair are the same purchase as far as the cart is concerned; `email` and
/// `timestamp` are carried along but never compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Unique identifier, assigned at creation.
    pub id: LineItemId,
    /// Service type / package tier.
    #[serde(rename = "type")]
    pub kind: String,
    /// Unit price in the shop currency.
    #[serde(deserialize_with = "deserialize_price")]
    pub price: f64,
    /// Number of units.
    pub quantity: NonZeroU32,
    /// Contact email for the purchase.
    pub email: String,
    /// Customer domain the package is for.
    pub domain: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl LineItem {
    /// Create a new line item with a fresh id and the current time.
    ///
    /// `kind` and `domain` are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`LineItemError::InvalidPrice`] for a negative or non-finite
    /// price and [`LineItemError::EmptyField`] for a blank type or domain.
    pub fn new(
        kind: &str,
        domain: &str,
        price: f64,
        quantity: NonZeroU32,
        email: impl Into<String>,
    ) -> Result<Self, LineItemError> {
        if !price.is_finite() || price < 0.0 {
            return Err(LineItemError::InvalidPrice(price));
        }

        let kind = kind.trim();
        if kind.is_empty() {
            return Err(LineItemError::EmptyField("type"));
        }

        let domain = domain.trim();
        if domain.is_empty() {
            return Err(LineItemError::EmptyField("domain"));
        }

        Ok(Self {
            id: LineItemId::generate(),
            kind: kind.to_owned(),
            price,
            quantity,
            email: email.into(),
            domain: domain.to_owned(),
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    /// Whether `other` is the same purchase, i.e. shares `(type, domain)`.
    #[must_use]
    pub fn same_purchase(&self, other: &Self) -> bool {
        self.kind == other.kind && self.domain == other.domain
    }

    /// Price of the whole line (`price * quantity`).
    #[must_use]
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity.get())
    }
}

/// Reject stored prices that `LineItem::new` would not have accepted.
fn deserialize_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let price = f64::deserialize(deserializer)?;
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(serde::de::Error::custom(LineItemError::InvalidPrice(price)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn qty(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_new_trims_and_stamps() {
        let item = LineItem::new(" starter ", " shop.example ", 499.0, qty(1), "a@b.co").unwrap();
        assert_eq!(item.kind, "starter");
        assert_eq!(item.domain, "shop.example");
        assert!(item.timestamp > 0);
    }

    #[test]
    fn test_new_rejects_bad_price() {
        assert_eq!(
            LineItem::new("starter", "shop.example", -1.0, qty(1), ""),
            Err(LineItemError::InvalidPrice(-1.0))
        );
        assert!(LineItem::new("starter", "shop.example", f64::NAN, qty(1), "").is_err());
        assert!(LineItem::new("starter", "shop.example", f64::INFINITY, qty(1), "").is_err());
    }

    #[test]
    fn test_new_accepts_free_item() {
        assert!(LineItem::new("audit", "shop.example", 0.0, qty(1), "").is_ok());
    }

    #[test]
    fn test_new_rejects_blank_fields() {
        assert_eq!(
            LineItem::new("  ", "shop.example", 1.0, qty(1), ""),
            Err(LineItemError::EmptyField("type"))
        );
        assert_eq!(
            LineItem::new("starter", "", 1.0, qty(1), ""),
            Err(LineItemError::EmptyField("domain"))
        );
    }

    #[test]
    fn test_same_purchase_ignores_email_and_timestamp() {
        let a = LineItem::new("pro", "shop.example", 10.0, qty(1), "a@x.co").unwrap();
        let mut b = LineItem::new("pro", "shop.example", 12.0, qty(3), "b@y.co").unwrap();
        b.timestamp += 1_000;
        assert!(a.same_purchase(&b));

        let c = LineItem::new("pro", "other.example", 10.0, qty(1), "a@x.co").unwrap();
        assert!(!a.same_purchase(&c));
    }

    #[test]
    fn test_line_total() {
        let item = LineItem::new("pro", "shop.example", 12.5, qty(4), "").unwrap();
        assert!((item.line_total() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_storage_field_names() {
        let item = LineItem::new("pro", "shop.example", 10.0, qty(2), "a@x.co").unwrap();
        let value = serde_json::to_value(&item).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["domain", "email", "id", "price", "quantity", "timestamp", "type"]
        );
        assert_eq!(object["type"], "pro");
        assert_eq!(object["quantity"], 2);
    }

    #[test]
    fn test_zero_quantity_does_not_deserialize() {
        let json = r#"{"id":"1","type":"pro","price":10,"quantity":0,"email":"","domain":"d","timestamp":0}"#;
        assert!(serde_json::from_str::<LineItem>(json).is_err());
    }

    #[test]
    fn test_negative_price_does_not_deserialize() {
        let json = r#"{"id":"1","type":"pro","price":-5,"quantity":1,"email":"","domain":"d","timestamp":0}"#;
        assert!(serde_json::from_str::<LineItem>(json).is_err());
    }
}
