use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use serde_json::json;

use crate::services::metrics::get_metrics;
use crate::AppState;

/// Liveness probe.
///
/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Readiness probe; fails when the database is unreachable.
///
/// GET /ready
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not ready" })),
            )
        }
    }
}

/// Prometheus metrics in text exposition format.
///
/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    get_metrics()
}
