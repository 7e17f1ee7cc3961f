mod common;

use common::{approved_entry, billing_fixture, d, date, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn generated_invoice_prices_entries_and_marks_them_billed() {
    let app = TestApp::spawn().await;
    // 19% tax, 90.00/h
    let fixture = billing_fixture(&app, "0.19", "90.00").await;

    let entry_a = approved_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let entry_b = approved_entry(&app, &fixture, date("2024-03-05"), "2.5").await;

    let response = app
        .post(
            "/api/invoices",
            Some(&fixture.admin_token),
            &json!({
                "client_id": fixture.client_id,
                "period_start": "2024-03-01",
                "period_end": "2024-03-31",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["status"].as_str().unwrap(), "draft");
    assert!(body["invoice_number"].is_null());
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    // 6h * 90 + 2.5h * 90 = 765.00; tax 19% = 145.35; total 910.35
    let subtotal = d(body["subtotal"].as_str().unwrap());
    let tax_amount = d(body["tax_amount"].as_str().unwrap());
    let total = d(body["total"].as_str().unwrap());
    assert_eq!(subtotal, d("765.00"));
    assert_eq!(tax_amount, d("145.35"));
    assert_eq!(total, d("910.35"));
    assert_eq!(total, subtotal + tax_amount);

    // Both entries are billed now.
    for entry_id in [entry_a, entry_b] {
        let response = app
            .get(
                &format!("/api/time-entries/{}", entry_id),
                Some(&fixture.worker_token),
            )
            .await;
        let entry: Value = response.json().await.unwrap();
        assert_eq!(entry["status"].as_str().unwrap(), "billed");
    }
}

#[tokio::test]
async fn billed_entries_are_not_picked_up_twice() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    approved_entry(&app, &fixture, date("2024-03-04"), "6").await;

    let generate = json!({
        "client_id": fixture.client_id,
        "period_start": "2024-03-01",
        "period_end": "2024-03-31",
    });

    let response = app
        .post("/api/invoices", Some(&fixture.admin_token), &generate)
        .await;
    assert_eq!(response.status().as_u16(), 201);

    // Nothing approved remains in the period.
    let response = app
        .post("/api/invoices", Some(&fixture.admin_token), &generate)
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn empty_period_is_a_bad_request() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    let response = app
        .post(
            "/api/invoices",
            Some(&fixture.admin_token),
            &json!({
                "client_id": fixture.client_id,
                "period_start": "2024-01-01",
                "period_end": "2024-01-31",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn sending_assigns_a_sequential_number_and_issue_date() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    approved_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let response = app
        .post(
            "/api/invoices",
            Some(&fixture.admin_token),
            &json!({
                "client_id": fixture.client_id,
                "period_start": "2024-03-01",
                "period_end": "2024-03-31",
            }),
        )
        .await;
    let invoice: Value = response.json().await.unwrap();
    let invoice_id = invoice["invoice_id"].as_str().unwrap().to_string();

    let response = app
        .post_empty(
            &format!("/api/invoices/{}/send", invoice_id),
            Some(&fixture.admin_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"].as_str().unwrap(), "sent");
    let number = body["invoice_number"].as_str().unwrap();
    assert!(number.starts_with("INV-"), "unexpected number {}", number);
    assert!(body["issue_date"].is_string());
    assert!(body["due_date"].is_string());

    // Sending twice is rejected.
    let response = app
        .post_empty(
            &format!("/api/invoices/{}/send", invoice_id),
            Some(&fixture.admin_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    // Paying a sent invoice works.
    let response = app
        .post_empty(
            &format!("/api/invoices/{}/pay", invoice_id),
            Some(&fixture.admin_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"].as_str().unwrap(), "paid");
}

#[tokio::test]
async fn cancelling_releases_entries_for_rebilling() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    let entry_id = approved_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let generate = json!({
        "client_id": fixture.client_id,
        "period_start": "2024-03-01",
        "period_end": "2024-03-31",
    });
    let response = app
        .post("/api/invoices", Some(&fixture.admin_token), &generate)
        .await;
    let invoice: Value = response.json().await.unwrap();
    let invoice_id = invoice["invoice_id"].as_str().unwrap().to_string();

    let response = app
        .post_empty(
            &format!("/api/invoices/{}/cancel", invoice_id),
            Some(&fixture.admin_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"].as_str().unwrap(), "cancelled");

    // The entry is approved again and can be billed on a fresh invoice.
    let response = app
        .get(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
        )
        .await;
    let entry: Value = response.json().await.unwrap();
    assert_eq!(entry["status"].as_str().unwrap(), "approved");

    let response = app
        .post("/api/invoices", Some(&fixture.admin_token), &generate)
        .await;
    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn non_admin_cannot_generate_or_send() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    approved_entry(&app, &fixture, date("2024-03-04"), "6").await;

    let response = app
        .post(
            "/api/invoices",
            Some(&fixture.worker_token),
            &json!({
                "client_id": fixture.client_id,
                "period_start": "2024-03-01",
                "period_end": "2024-03-31",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn client_portal_sees_only_its_own_sent_invoices() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    approved_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let generate = json!({
        "client_id": fixture.client_id,
        "period_start": "2024-03-01",
        "period_end": "2024-03-31",
    });
    let response = app
        .post("/api/invoices", Some(&fixture.admin_token), &generate)
        .await;
    let invoice: Value = response.json().await.unwrap();
    let invoice_id = invoice["invoice_id"].as_str().unwrap().to_string();

    // A portal login tied to the client.
    let (portal_id, _) = app
        .register_and_login("portal@acme.example", "password123")
        .await;
    app.link_client_user(fixture.client_id, portal_id).await;
    let portal_token = app.login("portal@acme.example", "password123").await;

    // Draft invoices are invisible to the portal.
    let response = app
        .get(&format!("/api/invoices/{}", invoice_id), Some(&portal_token))
        .await;
    assert_eq!(response.status().as_u16(), 404);

    app.post_empty(
        &format!("/api/invoices/{}/send", invoice_id),
        Some(&fixture.admin_token),
    )
    .await;

    let response = app
        .get(&format!("/api/invoices/{}", invoice_id), Some(&portal_token))
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.get("/api/invoices", Some(&portal_token)).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);

    // The portal cannot mutate anything.
    let response = app
        .post_empty(
            &format!("/api/invoices/{}/pay", invoice_id),
            Some(&portal_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn pdf_download_returns_a_document() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0.19", "90.00").await;

    approved_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let response = app
        .post(
            "/api/invoices",
            Some(&fixture.admin_token),
            &json!({
                "client_id": fixture.client_id,
                "period_start": "2024-03-01",
                "period_end": "2024-03-31",
            }),
        )
        .await;
    let invoice: Value = response.json().await.unwrap();
    let invoice_id = invoice["invoice_id"].as_str().unwrap().to_string();

    let response = app
        .get(
            &format!("/api/invoices/{}/pdf", invoice_id),
            Some(&fixture.admin_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("attachment"));
    let body = response.bytes().await.unwrap();
    assert!(!body.is_empty());
}

#[tokio::test]
async fn deleting_a_draft_invoice_releases_entries() {
    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    let entry_id = approved_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let response = app
        .post(
            "/api/invoices",
            Some(&fixture.admin_token),
            &json!({
                "client_id": fixture.client_id,
                "period_start": "2024-03-01",
                "period_end": "2024-03-31",
            }),
        )
        .await;
    let invoice: Value = response.json().await.unwrap();
    let invoice_id = invoice["invoice_id"].as_str().unwrap().to_string();

    let response = app
        .delete(&format!("/api/invoices/{}", invoice_id), Some(&fixture.admin_token))
        .await;
    assert_eq!(response.status().as_u16(), 204);

    let response = app
        .get(
            &format!("/api/time-entries/{}", entry_id),
            Some(&fixture.worker_token),
        )
        .await;
    let entry: Value = response.json().await.unwrap();
    assert_eq!(entry["status"].as_str().unwrap(), "approved");
}

#[tokio::test]
async fn overdue_sweep_flags_past_due_invoices_which_remain_payable() {
    use sqlx::{Connection, PgConnection};
    use timebill::services::Database;

    let app = TestApp::spawn().await;
    let fixture = billing_fixture(&app, "0", "100.00").await;

    approved_entry(&app, &fixture, date("2024-03-04"), "6").await;
    let response = app
        .post(
            "/api/invoices",
            Some(&fixture.admin_token),
            &json!({
                "client_id": fixture.client_id,
                "period_start": "2024-03-01",
                "period_end": "2024-03-31",
            }),
        )
        .await;
    let invoice: Value = response.json().await.unwrap();
    let invoice_id = invoice["invoice_id"].as_str().unwrap().to_string();
    let invoice_uuid: uuid::Uuid = invoice_id.parse().unwrap();

    let response = app
        .post_empty(
            &format!("/api/invoices/{}/send", invoice_id),
            Some(&fixture.admin_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    // Backdate the due date so the invoice is past due.
    let mut conn = PgConnection::connect(&app.db_url).await.unwrap();
    sqlx::query("UPDATE invoices SET due_date = CURRENT_DATE - 1 WHERE invoice_id = $1")
        .bind(invoice_uuid)
        .execute(&mut conn)
        .await
        .unwrap();

    let db = Database::new(&app.db_url, 2, 1).await.unwrap();
    let swept = db.mark_overdue_invoices().await.unwrap();
    assert_eq!(swept, 1);

    let response = app
        .get(
            &format!("/api/invoices/{}", invoice_id),
            Some(&fixture.admin_token),
        )
        .await;
    let invoice: Value = response.json().await.unwrap();
    assert_eq!(invoice["status"].as_str().unwrap(), "overdue");

    // A second sweep finds nothing new.
    assert_eq!(db.mark_overdue_invoices().await.unwrap(), 0);

    // Overdue invoices can still be paid.
    let response = app
        .post_empty(
            &format!("/api/invoices/{}/pay", invoice_id),
            Some(&fixture.admin_token),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let invoice: Value = response.json().await.unwrap();
    assert_eq!(invoice["status"].as_str().unwrap(), "paid");
}
