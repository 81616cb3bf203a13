//! Brightline Core - Shared types library.
//!
//! This crate provides the types shared by every Brightline component:
//! - `storefront` - Marketing site, cart API and admin area
//! - `cli` - Command-line tools for the device-local cart and admin password
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP, no
//! storage backends. Anything that persists or serves a cart lives in the
//! storefront crate.
//!
//! # Modules
//!
//! - [`types`] - Line items, their identifiers, and email addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
