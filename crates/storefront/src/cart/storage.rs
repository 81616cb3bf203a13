//! Cart persistence adapter.
//!
//! The cart is stored as one JSON array under a fixed key in a
//! [`LocalStore`]. Loading never fails from the caller's point of view: a
//! missing value is an empty cart, and an unreadable or malformed value is
//! logged and treated as an empty cart. Saving is fire-and-forget; failures
//! are logged and dropped.

use std::future::Future;

use brightline_core::LineItem;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Fixed key the cart is stored under.
pub const CART_STORAGE_KEY: &str = "brightline-cart";

/// Errors raised by a [`LocalStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing medium holds something that is not a valid store.
    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A stored value is not in the backend's transport encoding.
    #[error("storage value is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    /// A stored value decoded to bytes that are not UTF-8.
    #[error("storage value is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The value does not fit in the backing medium.
    #[error("value too large for storage ({size} bytes, max {max})")]
    TooLarge {
        /// Encoded size of the rejected value.
        size: usize,
        /// Largest accepted size.
        max: usize,
    },
}

/// A client-side string key-value store.
///
/// Backends store raw strings; serialization of the cart is the adapter's
/// job. Implementations live in [`super::stores`].
pub trait LocalStore: Send + Sync + 'static {
    /// Read the value stored under `key`, if any.
    fn get_item(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Whether `set_item(key, value)` would be accepted size-wise.
    ///
    /// Backends without a size limit accept everything.
    fn fits(&self, key: &str, value: &str) -> bool {
        let _ = (key, value);
        true
    }
}

/// Persistence adapter: loads and saves the cart under [`CART_STORAGE_KEY`].
#[derive(Debug, Clone)]
pub struct CartStorage<S> {
    store: S,
}

impl<S: LocalStore> CartStorage<S> {
    /// Wrap a local store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Get a reference to the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Whether `items` could be persisted by the backing store.
    #[must_use]
    pub fn can_store(&self, items: &[LineItem]) -> bool {
        serde_json::to_string(items).is_ok_and(|raw| self.store.fits(CART_STORAGE_KEY, &raw))
    }

    /// Load the persisted cart.
    ///
    /// Returns an empty list when nothing is stored, when the store cannot be
    /// read, or when the stored value does not parse.
    pub async fn load(&self) -> Vec<LineItem> {
        let raw = match self.store.get_item(CART_STORAGE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted cart found");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted cart");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<LineItem>>(&raw) {
            Ok(items) => {
                debug!(items = items.len(), "Loaded persisted cart");
                items
            }
            Err(e) => {
                warn!(error = %e, "Persisted cart is malformed, starting empty");
                Vec::new()
            }
        }
    }

    /// Persist the full item list, overwriting the previous value.
    pub async fn save(&self, items: &[LineItem]) {
        let raw = match serde_json::to_string(items) {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Failed to serialize cart");
                return;
            }
        };

        if let Err(e) = self.store.set_item(CART_STORAGE_KEY, raw).await {
            error!(error = %e, items = items.len(), "Failed to persist cart");
        } else {
            debug!(items = items.len(), "Persisted cart");
        }
    }
}
