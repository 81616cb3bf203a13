//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `admin_password` - Admin password check and rotation over blob storage

pub mod admin_password;

pub use admin_password::{AdminError, AdminPasswordService};
