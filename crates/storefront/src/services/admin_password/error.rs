//! Admin password error types.

use thiserror::Error;

use crate::blob::BlobError;

/// Errors that can occur during admin password operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The supplied password does not match the current one.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The new password does not meet requirements.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Hashing or verifying a password failed.
    #[error("password hashing error")]
    PasswordHash,

    /// The stored password record could not be parsed.
    #[error("stored password record is corrupt: {0}")]
    CorruptRecord(#[from] serde_json::Error),

    /// Blob storage failed.
    #[error("blob storage error: {0}")]
    Blob(#[from] BlobError),

    /// A blocking hashing task did not complete.
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
