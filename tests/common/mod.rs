//! Shared helpers for integration tests.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
};
use storefront::{
    ServerConfig, create_app,
    db::Database,
    jwt::{Claims, TokenIssuer, TokenType},
};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-at-least-32-chars";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-at-least-32-chars";

/// Create a test app and return (app, db, issuer).
pub async fn create_test_app() -> (axum::Router, Database, TokenIssuer) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        access_token_secret: ACCESS_SECRET.to_vec(),
        refresh_token_secret: REFRESH_SECRET.to_vec(),
        secure_cookies: false,
    };
    (
        create_app(&config),
        db,
        TokenIssuer::new(ACCESS_SECRET, REFRESH_SECRET),
    )
}

/// Build a JSON POST request.
pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a request carrying a Cookie header.
pub fn request_with_cookie(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("cookie", cookie)
        .body(Body::empty())
        .unwrap()
}

/// Parse a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

/// Extract Set-Cookie headers from a response.
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Get the value of a named cookie from Set-Cookie headers.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies.iter().find_map(|c| {
        let rest = c.strip_prefix(&prefix)?;
        Some(rest.split(';').next().unwrap_or("").to_string())
    })
}

/// Check if cookies contain a token being cleared (Max-Age=0).
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", cookie_name)) && c.contains("Max-Age=0"))
}

/// Sign up a user and return (profile body, access token, refresh token).
pub async fn signup_user(
    app: &axum::Router,
    name: &str,
    email: &str,
    password: &str,
) -> (serde_json::Value, String, String) {
    let response = app
        .clone()
        .oneshot(json_request(
            "/auth/signup",
            serde_json::json!({ "name": name, "email": email, "password": password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);

    let cookies = extract_set_cookies(&response);
    let access = cookie_value(&cookies, "accessToken").expect("Missing access cookie");
    let refresh = cookie_value(&cookies, "refreshToken").expect("Missing refresh cookie");
    let body = body_json(response).await;
    (body, access, refresh)
}

/// Craft an access token that expired in the past, signed with the test
/// access secret.
pub fn make_expired_access_token(sub: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = Claims {
        sub: sub.to_string(),
        token_type: TokenType::Access,
        iat: now - 1000,
        exp: now - 500,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(ACCESS_SECRET),
    )
    .unwrap()
}
