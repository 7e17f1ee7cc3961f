mod common;

use common::{billing_fixture, d, date, draft_entry, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn create_and_update_draft_entry() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0.19", "90.00").await;

    let entry_id = draft_entry(&app, &fixture, date("2024-03-04"), "6.5").await;

    let response = app
        .put(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
            &json!({ "hours": "7.25", "description": "revised scope" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(d(body["hours"].as_str().unwrap()), d("7.25"));
    assert_eq!(body["status"].as_str().unwrap(), "draft");
}

#[tokio::test]
async fn non_owner_cannot_touch_another_users_entry() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "80.00").await;
    let entry_id = draft_entry(&app, &fixture, date("2024-03-04"), "4").await;

    let (_, other_token) = app
        .register_and_login(
            &format!("other-{}@example.com", Uuid::new_v4().simple()),
            "password123",
        )
        .await;

    let response = app
        .put(
            &format!("/api/time-entries/{}", entry_id),
            Some(&other_token),
            &json!({ "hours": "1" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .delete(&format!("/api/time-entries/{}", entry_id), Some(&other_token))
        .await;
    assert_eq!(response.status().as_u16(), 403);

    // The owner still sees the entry untouched.
    let response = app
        .get(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(d(body["hours"].as_str().unwrap()), d("4"));
}

#[tokio::test]
async fn submitted_entry_cannot_be_edited_or_deleted() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "80.00").await;
    let entry_id = draft_entry(&app, &fixture, date("2024-03-05"), "3").await;

    let response = app
        .post_empty(
            &format!("/api/time-entries/{}/submit", entry_id),
            Some(&fixture.worker_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"].as_str().unwrap(), "submitted");

    let response = app
        .put(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
            &json!({ "hours": "8" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .delete(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn zero_hours_entry_is_rejected() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "80.00").await;

    let response = app
        .post(
            "/api/time-entries",
            Some(&fixture.worker_token),
            &json!({
                "task_id": fixture.task_id,
                "entry_date": "2024-03-06",
                "hours": "0",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn listing_is_scoped_to_the_caller() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "80.00").await;
    draft_entry(&app, &fixture, date("2024-03-04"), "2").await;
    draft_entry(&app, &fixture, date("2024-03-05"), "3").await;

    let (_, other_token) = app
        .register_and_login(
            &format!("lister-{}@example.com", Uuid::new_v4().simple()),
            "password123",
        )
        .await;

    let response = app.get("/api/time-entries", Some(&other_token)).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 0);

    let response = app
        .get("/api/time-entries", Some(&fixture.worker_token))
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 2);
}
