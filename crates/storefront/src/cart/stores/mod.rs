//! [`LocalStore`](super::storage::LocalStore) backends.
//!
//! - [`CookieStore`] - the visitor's browser holds the value in a cookie
//! - [`FileStore`] - a JSON file on the local device (CLI)
//! - [`MemoryStore`] - process memory (tests)

mod cookie;
mod file;
mod memory;

pub use cookie::{CookieStore, MAX_COOKIE_BYTES};
pub use file::FileStore;
pub use memory::MemoryStore;
