//! Local cart commands.
//!
//! The CLI keeps its cart in a JSON file (the `--store` path) under the same
//! key the browser cookie uses, so the record format is identical.
//!
//! # Usage
//!
//! ```bash
//! bl-cli cart add --type managed-hosting --domain example.com --price 49 --email ops@example.com
//! bl-cli cart show
//! bl-cli cart remove <ID>
//! bl-cli cart clear
//! ```

use std::future::Future;
use std::num::NonZeroU32;
use std::path::Path;

use brightline_core::{Email, LineItem, LineItemId};
use brightline_storefront::cart::{
    CartHandle, CartStorage, provide_cart, stores::FileStore, use_cart,
};
use brightline_storefront::routes::cart::CartView;

use super::CliError;

/// Arguments for adding a line item.
#[derive(Debug, Clone)]
pub struct AddItem {
    pub kind: String,
    pub domain: String,
    pub price: f64,
    pub quantity: NonZeroU32,
    pub email: String,
}

/// Run `command` inside a cart scope over the file at `store`.
///
/// Waits until the cart has been written back before returning its final
/// state.
async fn with_cart<Fut>(store: &Path, command: Fut) -> Result<CartView, CliError>
where
    Fut: Future<Output = Result<(), CliError>>,
{
    let cart = CartHandle::mount(CartStorage::new(FileStore::new(store)));
    cart.ready().await;

    let view = provide_cart(cart.clone(), async {
        command.await?;
        Ok::<_, CliError>(CartView::from(&use_cart()?))
    })
    .await?;

    cart.flush().await;
    tracing::debug!(store = %store.display(), items = view.items.len(), "Cart saved");
    Ok(view)
}

/// Show the cart.
///
/// # Errors
///
/// Only fails on a scope wiring error.
pub async fn show(store: &Path) -> Result<CartView, CliError> {
    with_cart(store, async { Ok(()) }).await
}

/// Add a line item, merging it into an existing one for the same type and
/// domain.
///
/// # Errors
///
/// Returns an error if the email, price, type or domain is invalid.
pub async fn add(store: &Path, item: AddItem) -> Result<CartView, CliError> {
    with_cart(store, async move {
        let email = Email::parse(&item.email)?;
        let item = LineItem::new(
            &item.kind,
            &item.domain,
            item.price,
            item.quantity,
            email.into_inner(),
        )?;

        tracing::info!(id = %item.id, kind = %item.kind, domain = %item.domain, "Adding line item");
        use_cart()?.add_to_cart(item);
        Ok(())
    })
    .await
}

/// Remove a line item. Unknown ids are ignored.
///
/// # Errors
///
/// Only fails on a scope wiring error.
pub async fn remove(store: &Path, id: &str) -> Result<CartView, CliError> {
    with_cart(store, async {
        use_cart()?.remove_from_cart(&LineItemId::from(id));
        Ok(())
    })
    .await
}

/// Remove every line item.
///
/// # Errors
///
/// Only fails on a scope wiring error.
pub async fn clear(store: &Path) -> Result<CartView, CliError> {
    with_cart(store, async {
        use_cart()?.clear_cart();
        Ok(())
    })
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hosting(quantity: u32) -> AddItem {
        AddItem {
            kind: "managed-hosting".to_string(),
            domain: "example.com".to_string(),
            price: 49.0,
            quantity: NonZeroU32::new(quantity).unwrap(),
            email: "ops@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_persists_across_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("local-store.json");

        add(&store, hosting(1)).await.unwrap();
        let view = add(&store, hosting(2)).await.unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.total_items, 3);
        assert_eq!(view.subtotal, "$147.00");

        let reloaded = show(&store).await.unwrap();
        assert_eq!(reloaded.items, view.items);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("local-store.json");

        let view = add(&store, hosting(1)).await.unwrap();
        let mut seo = hosting(1);
        seo.kind = "seo-audit".to_string();
        add(&store, seo).await.unwrap();

        let id = view.items.first().unwrap().id.to_string();
        let view = remove(&store, &id).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items.first().unwrap().kind, "seo-audit");

        let view = remove(&store, "no-such-id").await.unwrap();
        assert_eq!(view.items.len(), 1);

        assert!(clear(&store).await.unwrap().items.is_empty());
        assert!(show(&store).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("local-store.json");

        let mut bad_email = hosting(1);
        bad_email.email = "nobody".to_string();
        assert!(matches!(add(&store, bad_email).await, Err(CliError::Email(_))));

        let mut bad_price = hosting(1);
        bad_price.price = -5.0;
        assert!(matches!(
            add(&store, bad_price).await,
            Err(CliError::LineItem(_))
        ));

        assert!(show(&store).await.unwrap().items.is_empty());
    }
}
