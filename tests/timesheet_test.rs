mod common;

use common::{billing_fixture, date, draft_entry, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn timesheet_collects_draft_entries_in_period() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    draft_entry(&app, &fixture, date("2024-03-04"), "6").await;
    draft_entry(&app, &fixture, date("2024-03-06"), "4").await;
    // Outside the period, must not be attached.
    draft_entry(&app, &fixture, date("2024-03-12"), "8").await;

    let response = app
        .post(
            "/api/timesheets",
            Some(&fixture.worker_token),
            &json!({ "period_start": "2024-03-04", "period_end": "2024-03-10" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let sheet: Value = response.json().await.unwrap();
    let timesheet_id = sheet["timesheet_id"].as_str().unwrap().to_string();
    assert_eq!(sheet["status"].as_str().unwrap(), "draft");

    let response = app
        .get(
            &format!("/api/timesheets/{}", timesheet_id),
            Some(&fixture.worker_token),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn approval_cascades_to_entries() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    let entry_id = draft_entry(&app, &fixture, date("2024-03-04"), "6").await;

    let response = app
        .post(
            "/api/timesheets",
            Some(&fixture.worker_token),
            &json!({ "period_start": "2024-03-04", "period_end": "2024-03-08" }),
        )
        .await;
    let sheet: Value = response.json().await.unwrap();
    let timesheet_id = sheet["timesheet_id"].as_str().unwrap().to_string();

    let response = app
        .post_empty(
            &format!("/api/timesheets/{}/submit", timesheet_id),
            Some(&fixture.worker_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    // Entry moved to submitted together with the sheet.
    let response = app
        .get(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"].as_str().unwrap(), "submitted");

    let response = app
        .post_empty(
            &format!("/api/timesheets/{}/approve", timesheet_id),
            Some(&fixture.admin_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"].as_str().unwrap(), "approved");

    let response = app
        .get(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"].as_str().unwrap(), "approved");
}

#[tokio::test]
async fn rejection_cascades_and_entry_becomes_editable_again() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    let entry_id = draft_entry(&app, &fixture, date("2024-03-04"), "6").await;

    let response = app
        .post(
            "/api/timesheets",
            Some(&fixture.worker_token),
            &json!({ "period_start": "2024-03-04", "period_end": "2024-03-08" }),
        )
        .await;
    let sheet: Value = response.json().await.unwrap();
    let timesheet_id = sheet["timesheet_id"].as_str().unwrap().to_string();

    app.post_empty(
        &format!("/api/timesheets/{}/submit", timesheet_id),
        Some(&fixture.worker_token),
    )
    .await;

    let response = app
        .post_empty(
            &format!("/api/timesheets/{}/reject", timesheet_id),
            Some(&fixture.admin_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .get(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"].as_str().unwrap(), "rejected");

    // Editing a rejected entry moves it back to draft.
    let response = app
        .put(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
            &json!({ "hours": "5" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"].as_str().unwrap(), "draft");
}

#[tokio::test]
async fn only_admins_decide_timesheets() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    draft_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let response = app
        .post(
            "/api/timesheets",
            Some(&fixture.worker_token),
            &json!({ "period_start": "2024-03-04", "period_end": "2024-03-08" }),
        )
        .await;
    let sheet: Value = response.json().await.unwrap();
    let timesheet_id = sheet["timesheet_id"].as_str().unwrap().to_string();

    app.post_empty(
        &format!("/api/timesheets/{}/submit", timesheet_id),
        Some(&fixture.worker_token),
    )
    .await;

    let response = app
        .post_empty(
            &format!("/api/timesheets/{}/approve", timesheet_id),
            Some(&fixture.worker_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn draft_timesheet_deletion_detaches_entries() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    let entry_id = draft_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let response = app
        .post(
            "/api/timesheets",
            Some(&fixture.worker_token),
            &json!({ "period_start": "2024-03-04", "period_end": "2024-03-08" }),
        )
        .await;
    let sheet: Value = response.json().await.unwrap();
    let timesheet_id = sheet["timesheet_id"].as_str().unwrap().to_string();

    let response = app
        .delete(
            &format!("/api/timesheets/{}", timesheet_id),
            Some(&fixture.worker_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 204);

    // The entry survives, unattached and still draft.
    let response = app
        .get(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"].as_str().unwrap(), "draft");
    assert!(body["timesheet_id"].is_null());
}

#[tokio::test]
async fn submitting_twice_is_a_bad_request() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    draft_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let response = app
        .post(
            "/api/timesheets",
            Some(&fixture.worker_token),
            &json!({ "period_start": "2024-03-04", "period_end": "2024-03-08" }),
        )
        .await;
    let sheet: Value = response.json().await.unwrap();
    let timesheet_id = sheet["timesheet_id"].as_str().unwrap().to_string();

    let response = app
        .post_empty(
            &format!("/api/timesheets/{}/submit", timesheet_id),
            Some(&fixture.worker_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .post_empty(
            &format!("/api/timesheets/{}/submit", timesheet_id),
            Some(&fixture.worker_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn racing_submits_yield_one_success_and_one_rejection() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    draft_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let response = app
        .post(
            "/api/timesheets",
            Some(&fixture.worker_token),
            &json!({ "period_start": "2024-03-04", "period_end": "2024-03-04" }),
        )
        .await;
    let sheet: Value = response.json().await.unwrap();
    let timesheet_id = sheet["timesheet_id"].as_str().unwrap().to_string();

    let path = format!("/api/timesheets/{}/submit", timesheet_id);
    let (first, second) = tokio::join!(
        app.post_empty(&path, Some(&fixture.worker_token)),
        app.post_empty(&path, Some(&fixture.worker_token)),
    );

    // Whichever interleaving Postgres picks, the loser gets a clean 400,
    // never a 500 from the vanished row.
    let mut statuses = [first.status().as_u16(), second.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 400]);
}
