//! Cookie-backed local store.
//!
//! Keys are cookie names. Values arrive with the request's `Cookie` header
//! and leave as `Set-Cookie` headers on the response, so the cart lives in
//! the visitor's browser and nothing about it is kept on the server.
//!
//! Values travel as unpadded base64url, which only uses cookie-safe
//! characters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use tower_sessions::cookie::{Cookie, SameSite};
use tracing::warn;

use crate::cart::storage::{LocalStore, StoreError};

/// Largest cookie (name + encoded value) browsers are guaranteed to keep.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// A [`LocalStore`] over one request/response cookie exchange.
///
/// Clones share state: the middleware keeps one clone to collect the
/// `Set-Cookie` headers after the cart has written through another.
#[derive(Debug, Clone, Default)]
pub struct CookieStore {
    inner: Arc<Mutex<CookieState>>,
}

#[derive(Debug, Default)]
struct CookieState {
    /// Encoded values sent by the browser.
    incoming: HashMap<String, String>,
    /// Encoded values written during this request.
    pending: HashMap<String, String>,
}

impl CookieStore {
    /// Build a store from the request's `Cookie` headers.
    ///
    /// Cookies that fail to parse are skipped.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = HashMap::new();

        for header in headers.get_all(COOKIE) {
            let Ok(header) = header.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse(header).flatten() {
                incoming.insert(cookie.name().to_owned(), cookie.value().to_owned());
            }
        }

        Self {
            inner: Arc::new(Mutex::new(CookieState {
                incoming,
                pending: HashMap::new(),
            })),
        }
    }

    /// Drain the values written since the last call as `Set-Cookie` headers.
    ///
    /// Cookies are permanent, `HttpOnly`, `SameSite=Lax` and scoped to `/`;
    /// `secure` adds the `Secure` attribute.
    #[must_use]
    pub fn take_set_cookie_headers(&self, secure: bool) -> Vec<HeaderValue> {
        let pending = std::mem::take(&mut self.state().pending);

        pending
            .into_iter()
            .filter_map(|(name, value)| {
                let cookie = Cookie::build((name, value))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .secure(secure)
                    .permanent()
                    .build();

                HeaderValue::from_str(&cookie.to_string())
                    .inspect_err(|e| warn!(error = %e, "Dropping unrepresentable cookie"))
                    .ok()
            })
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, CookieState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Size of the cookie `key=<encoded value>` as the browser counts it.
fn cookie_size(key: &str, value: &str) -> usize {
    base64::encoded_len(value.len(), false)
        .and_then(|encoded| encoded.checked_add(key.len()))
        .unwrap_or(usize::MAX)
}

impl LocalStore for CookieStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let encoded = {
            let state = self.state();
            state
                .pending
                .get(key)
                .or_else(|| state.incoming.get(key))
                .cloned()
        };

        let Some(encoded) = encoded else {
            return Ok(None);
        };
        let bytes = URL_SAFE_NO_PAD.decode(encoded)?;
        Ok(Some(String::from_utf8(bytes)?))
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        let size = cookie_size(key, &value);
        if size > MAX_COOKIE_BYTES {
            return Err(StoreError::TooLarge {
                size,
                max: MAX_COOKIE_BYTES,
            });
        }

        let encoded = URL_SAFE_NO_PAD.encode(value);
        self.state().pending.insert(key.to_owned(), encoded);
        Ok(())
    }

    fn fits(&self, key: &str, value: &str) -> bool {
        cookie_size(key, value) <= MAX_COOKIE_BYTES
    }
}
