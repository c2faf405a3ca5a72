//! Registration, login and token handling.

mod common;

use axum::http::StatusCode;
use common::{app, DEFAULT_PASSWORD, MAX_BODY_BYTES};
use serde_json::json;

#[tokio::test]
async fn register_then_login() {
    let app = app();

    let resp = app
        .post_json(
            "/api/register",
            json!({
                "name": "Grace",
                "email": " Grace@Example.com ",
                "password": "hopper1906",
                "role": "hiring",
            }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.json()["msg"], "user registered successfully");

    let resp = app
        .post_json(
            "/api/login",
            json!({ "email": "grace@example.com", "password": "hopper1906" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["user"]["email"], "grace@example.com");
    assert_eq!(body["user"]["role"], "hiring");
    assert!(body["user"].get("password_hash").is_none());
    let token = body["token"].as_str().unwrap().to_string();
    assert!(token.starts_with("v4.local."));

    let resp = app.get("/api/profile", Some(&token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["user"]["name"], "Grace");
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let app = app();
    app.seeker("Ada").await;

    let resp = app
        .post_json(
            "/api/register",
            json!({
                "name": "Other Ada",
                "email": "ADA@example.com",
                "password": "long enough",
                "role": "job_seeker",
            }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "user already exists");
}

#[tokio::test]
async fn register_validates_input() {
    let app = app();

    let resp = app
        .post_json(
            "/api/register",
            json!({ "email": "x@example.com", "password": "long enough", "role": "hiring" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "name is required");

    let resp = app
        .post_json(
            "/api/register",
            json!({ "name": "X", "email": "x@example.com", "password": "long enough", "role": "admin" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid role");

    let resp = app
        .post_json(
            "/api/register",
            json!({ "name": "X", "email": "x@example.com", "password": "short", "role": "hiring" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error_message(),
        "password must be between 8 and 128 characters"
    );
}

#[tokio::test]
async fn login_with_bad_credentials() {
    let app = app();
    let ada = app.seeker("Ada").await;

    let resp = app
        .post_json(
            "/api/login",
            json!({ "email": ada.email, "password": "wrong password" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid credentials");

    let resp = app
        .post_json(
            "/api/login",
            json!({ "email": "nobody@example.com", "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post_json(
            "/api/login",
            json!({ "email": ada.email, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_reject_missing_and_bad_tokens() {
    let app = app();

    let resp = app.get("/api/profile", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "no token, access denied");

    let resp = app
        .request(
            axum::http::Method::GET,
            "/api/profile",
            None,
            &[("Authorization", "Basic abc")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app.get("/api/profile", Some("v4.local.bogus")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "token is not valid");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = app();

    let resp = app.get("/health", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "ok");
    assert!(resp.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let app = app();
    let name = "x".repeat(MAX_BODY_BYTES + 1);
    let body = json!({
        "name": name,
        "email": "big@example.com",
        "password": "long enough",
        "role": "hiring",
    });
    let length = serde_json::to_string(&body).unwrap().len().to_string();

    let resp = app
        .request(
            axum::http::Method::POST,
            "/api/register",
            Some(body),
            &[("content-length", length.as_str())],
        )
        .await;
    assert_eq!(resp.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let app = app();

    let resp = app
        .request(
            axum::http::Method::OPTIONS,
            "/api/posts",
            None,
            &[
                ("origin", "http://localhost:3000"),
                ("access-control-request-method", "POST"),
                ("access-control-request-headers", "authorization,content-type"),
            ],
        )
        .await;
    assert!(resp.status.is_success());
    assert_eq!(
        resp.headers.get("access-control-allow-origin").unwrap(),
        "*"
    );
    let methods = resp.headers["access-control-allow-methods"].to_str().unwrap();
    assert!(methods.contains("POST"));
}
