//! Core types for Brightline.
//!
//! This module provides type-safe wrappers for the cart's domain concepts.

pub mod email;
pub mod id;
pub mod line_item;

pub use email::{Email, EmailError};
pub use id::LineItemId;
pub use line_item::{LineItem, LineItemError};
