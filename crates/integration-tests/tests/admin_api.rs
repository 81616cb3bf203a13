//! Integration tests for the admin API.
//!
//! Covers login sessions, password rotation and the login rate limit.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use brightline_integration_tests::{INITIAL_ADMIN_PASSWORD, TestApp};
use brightline_storefront::middleware::session::SESSION_COOKIE_NAME;
use serde_json::json;

const NEW_PASSWORD: &str = "rotated-Pa55word!";

async fn login(app: &mut TestApp, password: &str) -> StatusCode {
    app.post("/api/admin/login", &json!({ "password": password }))
        .await
        .status
}

async fn is_authenticated(app: &mut TestApp) -> bool {
    app.get("/api/admin/session").await.json()["authenticated"]
        .as_bool()
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let mut app = TestApp::new();
    assert_eq!(app.get("/health").await.status, StatusCode::OK);
    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_and_logout() {
    let mut app = TestApp::new();
    assert!(!is_authenticated(&mut app).await);

    assert_eq!(login(&mut app, "wrong-password-x").await, StatusCode::UNAUTHORIZED);
    assert!(!is_authenticated(&mut app).await);

    assert_eq!(login(&mut app, INITIAL_ADMIN_PASSWORD).await, StatusCode::OK);
    assert!(app.cookie(SESSION_COOKIE_NAME).is_some());
    assert!(is_authenticated(&mut app).await);

    let resp = app.post("/api/admin/logout", &json!({})).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    assert!(!is_authenticated(&mut app).await);
}

#[tokio::test]
async fn test_rotate_requires_login() {
    let mut app = TestApp::new();

    let resp = app
        .post(
            "/api/admin/password",
            &json!({
                "current_password": INITIAL_ADMIN_PASSWORD,
                "new_password": NEW_PASSWORD,
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    app.clear_cookies();
    assert_eq!(login(&mut app, INITIAL_ADMIN_PASSWORD).await, StatusCode::OK);
}

#[tokio::test]
async fn test_rotate_then_login_with_new_password() {
    let mut app = TestApp::new();
    assert_eq!(login(&mut app, INITIAL_ADMIN_PASSWORD).await, StatusCode::OK);

    let weak = app
        .post(
            "/api/admin/password",
            &json!({
                "current_password": INITIAL_ADMIN_PASSWORD,
                "new_password": "short",
            }),
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);

    let rotated = app
        .post(
            "/api/admin/password",
            &json!({
                "current_password": INITIAL_ADMIN_PASSWORD,
                "new_password": NEW_PASSWORD,
            }),
        )
        .await;
    assert_eq!(rotated.status, StatusCode::NO_CONTENT);

    app.clear_cookies();
    assert_eq!(
        login(&mut app, INITIAL_ADMIN_PASSWORD).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(login(&mut app, NEW_PASSWORD).await, StatusCode::OK);
    assert!(is_authenticated(&mut app).await);
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let mut app = TestApp::new();

    // Malformed bodies are rejected by the handler, after the limiter has
    // counted them
    let mut statuses = Vec::new();
    for _ in 0..6 {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/admin/login")
            .header("x-forwarded-for", "198.51.100.20")
            .body(Body::empty())
            .unwrap();
        statuses.push(app.send_request(request).await.status);
    }

    assert!(statuses[..5].iter().all(|status| *status != StatusCode::TOO_MANY_REQUESTS));
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);

    // Other clients are unaffected
    assert_eq!(login(&mut app, INITIAL_ADMIN_PASSWORD).await, StatusCode::OK);
}
