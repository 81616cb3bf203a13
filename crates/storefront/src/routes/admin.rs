//! Admin API route handlers.
//!
//! Login, logout and password rotation for the shared admin password.

use axum::{Json, extract::State, http::StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAdmin, RequireAdmin, clear_admin_session, set_admin_session};
use crate::state::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: SecretString,
}

/// Password rotation request body.
#[derive(Debug, Deserialize)]
pub struct RotatePasswordRequest {
    pub current_password: SecretString,
    pub new_password: SecretString,
}

/// Admin session status.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Log in with the admin password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionStatus>> {
    if !state
        .admin_password()
        .check(request.password.expose_secret())
        .await?
    {
        tracing::warn!("Rejected admin login");
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }

    set_admin_session(&session).await?;
    tracing::info!("Admin logged in");

    Ok(Json(SessionStatus {
        authenticated: true,
    }))
}

/// Log out of the admin session.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_admin_session(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Report whether the caller is logged in as admin.
#[instrument(skip_all)]
pub async fn session_status(OptionalAdmin(admin): OptionalAdmin) -> Json<SessionStatus> {
    Json(SessionStatus {
        authenticated: admin.is_some(),
    })
}

/// Rotate the admin password.
#[instrument(skip_all)]
pub async fn rotate_password(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<RotatePasswordRequest>,
) -> Result<StatusCode> {
    state
        .admin_password()
        .rotate(
            request.current_password.expose_secret(),
            request.new_password.expose_secret(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
