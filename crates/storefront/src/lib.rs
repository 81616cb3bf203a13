//! Brightline Studio storefront library.
//!
//! The storefront serves the service-package cart over a small JSON API and
//! a password-gated admin API. This crate provides that functionality as a
//! library so the CLI and the integration tests can reuse it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod blob;
pub mod cart;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
