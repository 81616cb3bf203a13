//! Integration tests for Brightline Studio.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p brightline-integration-tests
//! ```
//!
//! The storefront router is driven in-process with `tower::ServiceExt`, so
//! no server, browser or network is needed. [`TestApp`] carries a small
//! cookie jar between requests, standing in for the visitor's browser.
//!
//! # Test Categories
//!
//! - `cart_api` - cookie-backed cart endpoints
//! - `admin_api` - admin login, sessions and password rotation

use std::collections::BTreeMap;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use brightline_storefront::{config::StorefrontConfig, routes, state::AppState};
use secrecy::SecretString;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

/// Initial admin password configured for every test app.
pub const INITIAL_ADMIN_PASSWORD: &str = "initial-Pa55word!";

/// Largest response body the helpers will read.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// A storefront instance with its own blob directory and cookie jar.
pub struct TestApp {
    router: Router,
    cookies: BTreeMap<String, String>,
    _blob_dir: TempDir,
}

/// A buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Parse the body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    /// Names of the cookies this response sets.
    #[must_use]
    pub fn set_cookie_names(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split_once('=').map(|(name, _)| name.to_string()))
            .collect()
    }
}

impl TestApp {
    /// Build a fresh storefront.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory or the app state cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let blob_dir = tempfile::tempdir().expect("Failed to create blob dir");
        let config = StorefrontConfig {
            host: [127, 0, 0, 1].into(),
            port: 3000,
            base_url: Url::parse("http://localhost:3000").expect("valid base url"),
            admin_initial_password: SecretString::from(INITIAL_ADMIN_PASSWORD),
            blob_dir: blob_dir.path().to_path_buf(),
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config).expect("Failed to create application state");

        Self {
            router: routes::app(state),
            cookies: BTreeMap::new(),
            _blob_dir: blob_dir,
        }
    }

    /// Current value of a cookie in the jar.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Put a cookie in the jar directly, as a tampering browser would.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    /// Forget every cookie, as a new visitor.
    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    /// Send a GET request.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Send a request with the jar's cookies and store any cookies set.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<&Value>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.10");

        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie_header);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send_request(request).await
    }

    /// Send a prepared request, storing any cookies set.
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be read.
    pub async fn send_request(&mut self, request: Request<Body>) -> TestResponse {
        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        };
        let (parts, body) = response.into_parts();

        for value in parts.headers.get_all(header::SET_COOKIE) {
            let Some((name, value)) = value
                .to_str()
                .ok()
                .and_then(|cookie| cookie.split(';').next())
                .and_then(|pair| pair.split_once('='))
            else {
                continue;
            };

            if value.is_empty() {
                self.cookies.remove(name.trim());
            } else {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }

        let body = to_bytes(body, MAX_BODY_BYTES)
            .await
            .expect("Failed to read response body")
            .to_vec();

        TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
