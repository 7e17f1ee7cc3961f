mod common;

use common::TestApp;
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn register_login_and_me_roundtrip() {
    let app = TestApp::spawn().await;
    let email = format!("user-{}@example.com", Uuid::new_v4().simple());

    let (user_id, token) = app.register_and_login(&email, "password123").await;

    let response = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user_id"].as_str().unwrap(), user_id.to_string());
    assert_eq!(body["email"].as_str().unwrap(), email);
    assert_eq!(body["role"].as_str().unwrap(), "user");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::spawn().await;
    let email = format!("dup-{}@example.com", Uuid::new_v4().simple());

    app.register_and_login(&email, "password123").await;

    let response = app
        .post(
            "/api/auth/register",
            None,
            &json!({ "email": email, "password": "password123", "name": "Again" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;
    let email = format!("pw-{}@example.com", Uuid::new_v4().simple());

    app.register_and_login(&email, "password123").await;

    let response = app
        .post(
            "/api/auth/login",
            None,
            &json!({ "email": email, "password": "wrong-password" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn invalid_registration_payload_is_rejected() {
    let app = TestApp::spawn().await;

    // Malformed email
    let response = app
        .post(
            "/api/auth/register",
            None,
            &json!({ "email": "not-an-email", "password": "password123", "name": "X" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);

    // Password too short
    let response = app
        .post(
            "/api/auth/register",
            None,
            &json!({ "email": "short@example.com", "password": "short", "name": "X" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);
}
