//! `bl-cli` subcommands.

pub mod admin;
pub mod cart;

use brightline_core::{EmailError, LineItemError};
use brightline_storefront::cart::ScopeError;
use brightline_storefront::services::AdminError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The cart was used outside its provider scope.
    #[error("Cart scope error: {0}")]
    Scope(#[from] ScopeError),

    /// The line item arguments are invalid.
    #[error("Invalid line item: {0}")]
    LineItem(#[from] LineItemError),

    /// The email argument is invalid.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    /// Admin password operation failed.
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// A password prompt failed or was cancelled.
    #[error("Prompt error: {0}")]
    Prompt(#[from] inquire::InquireError),

    /// Output could not be rendered.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}
