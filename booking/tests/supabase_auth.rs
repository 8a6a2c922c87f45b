//! Supabase Auth client tests against a mock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use booking::auth::SupabaseAuth;
use clubpass_core::auth::AuthProvider;
use clubpass_core::error::AuthError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_ID: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";

#[tokio::test]
async fn resolves_user_from_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", "anon"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": USER_ID,
            "aud": "authenticated",
            "email": "asha@example.com",
            "role": "authenticated"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = SupabaseAuth::new(server.uri(), "anon");
    let user = auth.user_from_token("access-1").await.expect("user");

    assert_eq!(user.id.to_string(), USER_ID);
    assert_eq!(user.email, "asha@example.com");
}

#[tokio::test]
async fn expired_token_is_invalid() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "msg": "invalid JWT: token is expired"
        })))
        .mount(&server)
        .await;

    let auth = SupabaseAuth::new(server.uri(), "anon");
    let err = auth.user_from_token("stale").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[tokio::test]
async fn sign_up_sends_full_name_as_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(header("apikey", "anon"))
        .and(body_partial_json(json!({
            "email": "asha@example.com",
            "data": {"full_name": "Asha Rao"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": USER_ID,
            "email": "asha@example.com",
            "confirmation_sent_at": "2025-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = SupabaseAuth::new(server.uri(), "anon");
    let user = auth
        .sign_up("asha@example.com", "nightout42", "Asha Rao")
        .await
        .expect("signed up");
    assert_eq!(user.id.to_string(), USER_ID);
}

#[tokio::test]
async fn sign_up_accepts_session_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "user": {"id": USER_ID, "email": "asha@example.com"}
        })))
        .mount(&server)
        .await;

    let auth = SupabaseAuth::new(server.uri(), "anon");
    let user = auth
        .sign_up("asha@example.com", "nightout42", "Asha Rao")
        .await
        .expect("signed up");
    assert_eq!(user.email, "asha@example.com");
}

#[tokio::test]
async fn duplicate_sign_up_is_rejected_with_provider_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": 422,
            "msg": "User already registered"
        })))
        .mount(&server)
        .await;

    let auth = SupabaseAuth::new(server.uri(), "anon");
    let err = auth
        .sign_up("asha@example.com", "nightout42", "Asha Rao")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Rejected(ref msg) if msg == "User already registered"));
}

#[tokio::test]
async fn sign_in_uses_password_grant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_partial_json(json!({"email": "asha@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "user": {"id": USER_ID, "email": "asha@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = SupabaseAuth::new(server.uri(), "anon");
    let session = auth
        .sign_in("asha@example.com", "nightout42")
        .await
        .expect("session");

    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.refresh_token, "refresh-1");
    assert_eq!(session.expires_in, 3600);
    assert_eq!(session.user.id.to_string(), USER_ID);
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let auth = SupabaseAuth::new(server.uri(), "anon");
    let err = auth.sign_in("asha@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn provider_outage_is_a_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let auth = SupabaseAuth::new(server.uri(), "anon");
    let err = auth.sign_in("asha@example.com", "nightout42").await.unwrap_err();
    assert!(matches!(err, AuthError::Provider(ref msg) if msg == "HTTP 503 Service Unavailable"));
}
