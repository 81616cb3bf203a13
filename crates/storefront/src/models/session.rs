//! Session-related types.
//!
//! Types stored in the session for admin authentication state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session-stored admin login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    /// When the password was accepted.
    pub authenticated_at: DateTime<Utc>,
}

impl AdminSession {
    /// A login that happened just now.
    #[must_use]
    pub fn now() -> Self {
        Self {
            authenticated_at: Utc::now(),
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the admin login.
    pub const ADMIN: &str = "admin";
}
