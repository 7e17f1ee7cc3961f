mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.get("/ready", None).await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn metrics_endpoint_returns_text() {
    let app = TestApp::spawn().await;

    let response = app.get("/metrics", None).await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/time-entries", None).await;
    assert_eq!(response.status().as_u16(), 401);

    let response = app.get("/api/invoices", Some("not-a-real-token")).await;
    assert_eq!(response.status().as_u16(), 401);
}
