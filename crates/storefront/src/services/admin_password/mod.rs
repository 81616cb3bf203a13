//! Admin password service.
//!
//! The admin area is gated by a single shared password. Its Argon2id hash
//! lives in a JSON record in blob storage; until the password has been
//! rotated for the first time, the configured initial password is the valid
//! one. The current hash is cached briefly so logins don't list the blob
//! store every time.
//!
//! Cache fills hold the rotation lock shared and rotations hold it
//! exclusively, so a hash read before a rotation is never cached after it.

mod error;

pub use error::AdminError;

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::blob::{BlobStore, PutOptions};

/// Blob key of the password record.
pub const PASSWORD_BLOB_KEY: &str = "admin/password.json";

/// Minimum admin password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// How long a loaded hash is trusted before re-reading blob storage.
const HASH_CACHE_TTL: Duration = Duration::from_secs(60);

/// Stored password record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordRecord {
    /// Argon2id PHC string.
    pub hash: String,
    /// When the password was last rotated.
    pub rotated_at: DateTime<Utc>,
}

/// Checks and rotates the admin password.
pub struct AdminPasswordService<B> {
    blobs: B,
    initial_hash: Arc<String>,
    current_hash: Cache<(), Arc<String>>,
    rotation: RwLock<()>,
}

impl<B: BlobStore> AdminPasswordService<B> {
    /// Create the service.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::PasswordHash` if the initial password cannot be
    /// hashed.
    pub fn new(blobs: B, initial_password: &SecretString) -> Result<Self, AdminError> {
        let initial_hash = hash_password(initial_password.expose_secret())?;

        Ok(Self {
            blobs,
            initial_hash: Arc::new(initial_hash),
            current_hash: Cache::builder()
                .max_capacity(1)
                .time_to_live(HASH_CACHE_TTL)
                .build(),
            rotation: RwLock::new(()),
        })
    }

    /// Get a reference to the underlying blob store.
    #[must_use]
    pub const fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Check `candidate` against the current admin password.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored record cannot be read or parsed.
    #[instrument(skip_all)]
    pub async fn check(&self, candidate: &str) -> Result<bool, AdminError> {
        let hash = self.current_hash().await?;
        let candidate = candidate.to_owned();

        tokio::task::spawn_blocking(move || verify_password(&candidate, &hash)).await?
    }

    /// Replace the admin password.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidCredentials` if `current` is wrong,
    /// `AdminError::WeakPassword` if `new` is too short or unchanged, and
    /// storage errors if the record cannot be written.
    #[instrument(skip_all)]
    pub async fn rotate(&self, current: &str, new: &str) -> Result<PasswordRecord, AdminError> {
        if !self.check(current).await? {
            return Err(AdminError::InvalidCredentials);
        }
        validate_password(new)?;
        if new == current {
            return Err(AdminError::WeakPassword(
                "new password must differ from the current one".to_string(),
            ));
        }

        let new = new.to_owned();
        let hash = tokio::task::spawn_blocking(move || hash_password(&new)).await??;
        let record = PasswordRecord {
            hash,
            rotated_at: Utc::now(),
        };

        let content = serde_json::to_vec(&record)?;
        let _rotation = self.rotation.write().await;
        self.blobs
            .put(
                PASSWORD_BLOB_KEY,
                content,
                PutOptions {
                    allow_overwrite: true,
                    add_random_suffix: false,
                },
            )
            .await?;
        self.current_hash
            .insert((), Arc::new(record.hash.clone()))
            .await;

        info!(rotated_at = %record.rotated_at, "Admin password rotated");
        Ok(record)
    }

    /// The stored password record, if the password was ever rotated.
    ///
    /// # Errors
    ///
    /// Returns an error if blob storage fails or the record is corrupt.
    pub async fn stored_record(&self) -> Result<Option<PasswordRecord>, AdminError> {
        let records = self.blobs.list(PASSWORD_BLOB_KEY).await?;
        let Some(record) = records
            .iter()
            .find(|record| record.pathname == PASSWORD_BLOB_KEY)
        else {
            return Ok(None);
        };

        let content = self.blobs.read(record).await?;
        Ok(Some(serde_json::from_slice(&content)?))
    }

    async fn current_hash(&self) -> Result<Arc<String>, AdminError> {
        if let Some(hash) = self.current_hash.get(&()).await {
            return Ok(hash);
        }

        let _rotation = self.rotation.read().await;
        if let Some(hash) = self.current_hash.get(&()).await {
            return Ok(hash);
        }

        let hash = match self.stored_record().await? {
            Some(record) => Arc::new(record.hash),
            None => Arc::clone(&self.initial_hash),
        };
        self.current_hash.insert((), Arc::clone(&hash)).await;
        Ok(hash)
    }
}

/// Validate a new admin password.
fn validate_password(password: &str) -> Result<(), AdminError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.trim() != password {
        return Err(AdminError::WeakPassword(
            "password cannot start or end with whitespace".to_string(),
        ));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AdminError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AdminError::PasswordHash)
}

/// Verify a password against a PHC hash string.
fn verify_password(password: &str, hash: &str) -> Result<bool, AdminError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AdminError::PasswordHash)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
