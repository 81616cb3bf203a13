//! Application state shared across handlers.

use std::sync::Arc;

use crate::blob::LocalBlobStore;
use crate::config::StorefrontConfig;
use crate::services::{AdminError, AdminPasswordService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. It holds configuration and
/// admin services only; carts live with the client and are never kept here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    admin_password: AdminPasswordService<LocalBlobStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The blob store is rooted at `config.blob_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial admin password cannot be hashed.
    pub fn new(config: StorefrontConfig) -> Result<Self, AdminError> {
        let blobs = LocalBlobStore::new(config.blob_dir.clone());
        let admin_password = AdminPasswordService::new(blobs, &config.admin_initial_password)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                admin_password,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the admin password service.
    #[must_use]
    pub fn admin_password(&self) -> &AdminPasswordService<LocalBlobStore> {
        &self.inner.admin_password
    }
}
