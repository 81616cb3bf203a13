//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with in-memory store, admin login only)
//! 4. Cart provider (per route group, cookie-backed cart scope)
//! 5. Rate limiting (governor, admin login only)

pub mod admin;
pub mod cart;
pub mod rate_limit;
pub mod session;

pub use admin::{OptionalAdmin, RequireAdmin, clear_admin_session, set_admin_session};
pub use cart::cart_provider_middleware;
pub use rate_limit::admin_login_rate_limiter;
pub use session::create_session_layer;
