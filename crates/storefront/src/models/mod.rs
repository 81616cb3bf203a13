//! Session-stored models for the storefront.
//!
//! Carts are deliberately absent: they live in the visitor's cookie jar.

pub mod session;

pub use session::{AdminSession, keys as session_keys};
