//! Shopping cart.
//!
//! The cart is a client-side record: an ordered list of line items kept in a
//! local key-value store on the visitor's side (a cookie for the web, a file
//! for the CLI). The server never keeps a copy.
//!
//! - [`storage`] - persistence adapter over a [`LocalStore`]
//! - [`stores`] - cookie, file and memory backends
//! - [`store`] - the in-memory cart with its hydrating/ready lifecycle
//! - [`scope`] - provider scope and the [`use_cart`] accessor

pub mod scope;
pub mod storage;
pub mod store;
pub mod stores;

pub use scope::{ScopeError, provide_cart, use_cart};
pub use storage::{CART_STORAGE_KEY, CartStorage, LocalStore, StoreError};
pub use store::{CartFullError, CartHandle, Phase};
