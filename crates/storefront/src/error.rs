//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use brightline_core::{EmailError, LineItemError};
use thiserror::Error;

use crate::cart::CartFullError;
use crate::services::AdminError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Admin password operation failed.
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The cart cannot hold the requested item.
    #[error("Cart is full: {0}")]
    CartFull(#[from] CartFullError),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<LineItemError> for AppError {
    fn from(err: LineItemError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        Self::BadRequest(format!("invalid email: {err}"))
    }
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Admin(err) => !matches!(
                err,
                AdminError::InvalidCredentials | AdminError::WeakPassword(_)
            ),
            Self::Session(_) => true,
            Self::CartFull(_) | Self::Unauthorized(_) | Self::BadRequest(_) => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Admin(AdminError::InvalidCredentials) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Admin(AdminError::WeakPassword(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::CartFull(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Admin(_) | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Admin(AdminError::InvalidCredentials) => "Invalid credentials".to_string(),
            Self::Admin(AdminError::WeakPassword(msg)) => msg.clone(),
            Self::CartFull(_) => "Cart is full".to_string(),
            _ if self.is_server_error() => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added line item", Some(&[("type", "hosting")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
