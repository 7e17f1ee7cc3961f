mod common;

use common::{billing_fixture, d, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn worker_cannot_manage_clients() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0.19", "90.00").await;
    let worker = Some(fixture.worker_token.as_str());

    let response = app
        .post(
            "/api/clients",
            worker,
            &json!({ "name": "Shadow Corp", "email": "shadow@example.com" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app.get("/api/clients", worker).await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .get(&format!("/api/clients/{}", fixture.client_id), worker)
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .put(
            &format!("/api/clients/{}", fixture.client_id),
            worker,
            &json!({ "tax_rate": "0" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .delete(&format!("/api/clients/{}", fixture.client_id), worker)
        .await;
    assert_eq!(response.status().as_u16(), 403);

    // The admin view of the client is untouched.
    let response = app
        .get(
            &format!("/api/clients/{}", fixture.client_id),
            Some(&fixture.admin_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let client: Value = response.json().await.unwrap();
    assert_eq!(client["name"].as_str().unwrap(), "Acme Corp");
}

#[tokio::test]
async fn worker_cannot_write_projects_or_tasks() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;
    let worker = Some(fixture.worker_token.as_str());

    let response = app
        .post(
            "/api/projects",
            worker,
            &json!({
                "client_id": fixture.client_id,
                "name": "Side Gig",
                "hourly_rate": "500.00",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .put(
            &format!("/api/projects/{}", fixture.project_id),
            worker,
            &json!({ "hourly_rate": "500.00" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .delete(&format!("/api/projects/{}", fixture.project_id), worker)
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .post(
            "/api/tasks",
            worker,
            &json!({ "project_id": fixture.project_id, "name": "Backdoor" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .put(
            &format!("/api/tasks/{}", fixture.task_id),
            worker,
            &json!({ "status": "done" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .delete(&format!("/api/tasks/{}", fixture.task_id), worker)
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .get(
            &format!("/api/projects/{}", fixture.project_id),
            Some(&fixture.admin_token),
        )
        .await;
    let project: Value = response.json().await.unwrap();
    assert_eq!(d(project["hourly_rate"].as_str().unwrap()), d("100.00"));
}

#[tokio::test]
async fn worker_can_still_read_projects_and_tasks() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;
    let worker = Some(fixture.worker_token.as_str());

    let response = app
        .get(&format!("/api/projects/{}", fixture.project_id), worker)
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .get(
            &format!("/api/tasks?project_id={}", fixture.project_id),
            worker,
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let tasks: Vec<Value> = response.json().await.unwrap();
    assert_eq!(tasks.len(), 1);
}
