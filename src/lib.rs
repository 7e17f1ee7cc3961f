pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::services::{Database, EmailService, JwtService};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub email: EmailService,
}

/// Assemble the full router. Everything under /api except register and
/// login requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login));

    let protected_api = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/clients", post(handlers::clients::create_client))
        .route("/clients", get(handlers::clients::list_clients))
        .route("/clients/:id", get(handlers::clients::get_client))
        .route("/clients/:id", put(handlers::clients::update_client))
        .route("/clients/:id", delete(handlers::clients::delete_client))
        .route("/projects", post(handlers::projects::create_project))
        .route("/projects", get(handlers::projects::list_projects))
        .route("/projects/:id", get(handlers::projects::get_project))
        .route("/projects/:id", put(handlers::projects::update_project))
        .route("/projects/:id", delete(handlers::projects::delete_project))
        .route("/tasks", post(handlers::tasks::create_task))
        .route("/tasks", get(handlers::tasks::list_tasks))
        .route("/tasks/:id", get(handlers::tasks::get_task))
        .route("/tasks/:id", put(handlers::tasks::update_task))
        .route("/tasks/:id", delete(handlers::tasks::delete_task))
        .route(
            "/time-entries",
            post(handlers::time_entries::create_time_entry),
        )
        .route(
            "/time-entries",
            get(handlers::time_entries::list_time_entries),
        )
        .route(
            "/time-entries/:id",
            get(handlers::time_entries::get_time_entry),
        )
        .route(
            "/time-entries/:id",
            put(handlers::time_entries::update_time_entry),
        )
        .route(
            "/time-entries/:id",
            delete(handlers::time_entries::delete_time_entry),
        )
        .route(
            "/time-entries/:id/submit",
            post(handlers::time_entries::submit_time_entry),
        )
        .route("/timesheets", post(handlers::timesheets::create_timesheet))
        .route("/timesheets", get(handlers::timesheets::list_timesheets))
        .route("/timesheets/:id", get(handlers::timesheets::get_timesheet))
        .route(
            "/timesheets/:id",
            delete(handlers::timesheets::delete_timesheet),
        )
        .route(
            "/timesheets/:id/submit",
            post(handlers::timesheets::submit_timesheet),
        )
        .route(
            "/timesheets/:id/approve",
            post(handlers::timesheets::approve_timesheet),
        )
        .route(
            "/timesheets/:id/reject",
            post(handlers::timesheets::reject_timesheet),
        )
        .route("/invoices", post(handlers::invoices::generate_invoice))
        .route("/invoices", get(handlers::invoices::list_invoices))
        .route("/invoices/:id", get(handlers::invoices::get_invoice))
        .route("/invoices/:id", delete(handlers::invoices::delete_invoice))
        .route(
            "/invoices/:id/pdf",
            get(handlers::invoices::download_invoice_pdf),
        )
        .route("/invoices/:id/send", post(handlers::invoices::send_invoice))
        .route(
            "/invoices/:id/pay",
            post(handlers::invoices::mark_invoice_paid),
        )
        .route(
            "/invoices/:id/cancel",
            post(handlers::invoices::cancel_invoice),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api", public_api.merge(protected_api))
        .layer(from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
