//! Tests for the refresh endpoint: renewal, revocation, and exact-match
//! verification against the stored record.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use storefront::jwt::TokenIssuer;
use tower::ServiceExt;

#[tokio::test]
async fn test_refresh_without_cookie() {
    let (app, _, _) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/refresh-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "No refresh token provided");
}

#[tokio::test]
async fn test_refresh_with_garbage_token() {
    let (app, _, _) = create_test_app().await;

    let response = app
        .oneshot(request_with_cookie(
            "POST",
            "/auth/refresh-token",
            "refreshToken=not-a-jwt",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid or expired refresh token");
}

#[tokio::test]
async fn test_refresh_issues_new_access_cookie_only() {
    let (app, _, _) = create_test_app().await;
    let (_, _, refresh) = signup_user(&app, "Alice", "alice@example.com", "hunter22").await;

    let response = app
        .oneshot(request_with_cookie(
            "POST",
            "/auth/refresh-token",
            &format!("refreshToken={}", refresh),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies = extract_set_cookies(&response);
    let access_cookie = cookie_value(&cookies, "accessToken").expect("Missing access cookie");
    assert!(!access_cookie.is_empty());
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("accessToken=") && c.contains("Max-Age=900"))
    );

    // No rotation: the refresh cookie is not reissued
    assert!(cookie_value(&cookies, "refreshToken").is_none());

    let body = body_json(response).await;
    assert_eq!(body["message"], "Token refreshed successfully");
}

#[tokio::test]
async fn test_refreshed_access_token_authenticates() {
    let (app, _, _) = create_test_app().await;
    let (profile, _, refresh) = signup_user(&app, "Alice", "alice@example.com", "hunter22").await;

    let response = app
        .clone()
        .oneshot(request_with_cookie(
            "POST",
            "/auth/refresh-token",
            &format!("refreshToken={}", refresh),
        ))
        .await
        .unwrap();
    let cookies = extract_set_cookies(&response);
    let access = cookie_value(&cookies, "accessToken").unwrap();

    let response = app
        .oneshot(request_with_cookie(
            "GET",
            "/auth/profile",
            &format!("accessToken={}", access),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], profile["id"]);
}

#[tokio::test]
async fn test_expired_access_token_does_not_block_refresh() {
    let (app, _, _) = create_test_app().await;
    let (profile, _, refresh) = signup_user(&app, "Alice", "alice@example.com", "hunter22").await;

    let expired = make_expired_access_token(profile["id"].as_str().unwrap());
    let response = app
        .oneshot(request_with_cookie(
            "POST",
            "/auth/refresh-token",
            &format!("accessToken={}; refreshToken={}", expired, refresh),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_new_login_revokes_previous_refresh_token() {
    let (app, _, _) = create_test_app().await;
    let (_, _, first_refresh) = signup_user(&app, "Alice", "alice@example.com", "hunter22").await;

    // Second login overwrites the single record
    let response = app
        .clone()
        .oneshot(json_request(
            "/auth/login",
            serde_json::json!({ "email": "alice@example.com", "password": "hunter22" }),
        ))
        .await
        .unwrap();
    let cookies = extract_set_cookies(&response);
    let second_refresh = cookie_value(&cookies, "refreshToken").unwrap();

    // The first credential no longer refreshes
    let response = app
        .clone()
        .oneshot(request_with_cookie(
            "POST",
            "/auth/refresh-token",
            &format!("refreshToken={}", first_refresh),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Refresh token is invalid or has been revoked");

    // The second one does
    let response = app
        .oneshot(request_with_cookie(
            "POST",
            "/auth/refresh-token",
            &format!("refreshToken={}", second_refresh),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let (app, _, _) = create_test_app().await;
    let (_, access, refresh) = signup_user(&app, "Alice", "alice@example.com", "hunter22").await;

    let response = app
        .clone()
        .oneshot(request_with_cookie(
            "POST",
            "/auth/logout",
            &format!("accessToken={}; refreshToken={}", access, refresh),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request_with_cookie(
            "POST",
            "/auth/refresh-token",
            &format!("refreshToken={}", refresh),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_signed_with_wrong_secret() {
    let (app, _, _) = create_test_app().await;
    signup_user(&app, "Alice", "alice@example.com", "hunter22").await;

    let forged_issuer = TokenIssuer::new(b"wrong-access-secret", b"wrong-refresh-secret");
    let forged = forged_issuer.generate_refresh_token("some-uuid").unwrap();

    let response = app
        .oneshot(request_with_cookie(
            "POST",
            "/auth/refresh-token",
            &format!("refreshToken={}", forged.token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_without_store_record_is_rejected() {
    let (app, _, issuer) = create_test_app().await;

    // Properly signed, but no record was ever stored for this identity
    let orphan = issuer.generate_refresh_token("ghost-uuid").unwrap();

    let response = app
        .oneshot(request_with_cookie(
            "POST",
            "/auth/refresh-token",
            &format!("refreshToken={}", orphan.token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Refresh token is invalid or has been revoked");
}

#[tokio::test]
async fn test_access_token_rejected_as_refresh_token() {
    let (app, _, _) = create_test_app().await;
    let (_, access, _) = signup_user(&app, "Alice", "alice@example.com", "hunter22").await;

    let response = app
        .oneshot(request_with_cookie(
            "POST",
            "/auth/refresh-token",
            &format!("refreshToken={}", access),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
