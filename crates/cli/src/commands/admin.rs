//! Admin password management commands.
//!
//! # Usage
//!
//! ```bash
//! bl-cli admin rotate-password --current-password '...' --new-password '...'
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_INITIAL_PASSWORD` - Valid password until the first rotation
//! - `BRIGHTLINE_BLOB_DIR` - Blob storage directory holding the password record

use std::path::Path;

use brightline_storefront::blob::LocalBlobStore;
use brightline_storefront::services::AdminPasswordService;
use brightline_storefront::services::admin_password::PasswordRecord;
use secrecy::{ExposeSecret, SecretString};

use super::CliError;

/// Rotate the admin password stored under `blob_dir`.
///
/// # Errors
///
/// Returns an error if `current` is wrong, `new` is too weak, or the record
/// cannot be written.
pub async fn rotate_password(
    blob_dir: &Path,
    initial: &SecretString,
    current: &SecretString,
    new: &SecretString,
) -> Result<PasswordRecord, CliError> {
    let service = AdminPasswordService::new(LocalBlobStore::new(blob_dir), initial)?;

    tracing::info!(blob_dir = %blob_dir.display(), "Rotating admin password...");
    let record = service
        .rotate(current.expose_secret(), new.expose_secret())
        .await?;

    tracing::info!("Admin password rotated at {}", record.rotated_at);
    Ok(record)
}
