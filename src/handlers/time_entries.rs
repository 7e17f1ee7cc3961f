//! Time entry CRUD and submission.
//!
//! Ownership rule: a non-admin may only see and touch their own entries.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::dtos::time_entries::{
    CreateTimeEntryRequest, ListTimeEntriesQuery, UpdateTimeEntryRequest,
};
use crate::error::AppError;
use crate::handlers::require_staff;
use crate::middleware::AuthUser;
use crate::models::{CreateTimeEntry, ListTimeEntriesFilter, TimeEntry, TimeEntryStatus};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

fn parse_entry_status(s: &str) -> Result<TimeEntryStatus, AppError> {
    match s {
        "draft" => Ok(TimeEntryStatus::Draft),
        "submitted" => Ok(TimeEntryStatus::Submitted),
        "approved" => Ok(TimeEntryStatus::Approved),
        "rejected" => Ok(TimeEntryStatus::Rejected),
        "billed" => Ok(TimeEntryStatus::Billed),
        other => Err(AppError::BadRequest(anyhow::anyhow!(
            "Unknown time entry status '{}'",
            other
        ))),
    }
}

async fn load_owned_entry(
    state: &AppState,
    auth: &AuthUser,
    time_entry_id: Uuid,
) -> Result<TimeEntry, AppError> {
    let entry = state
        .db
        .get_time_entry(time_entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Time entry not found")))?;

    if !auth.is_admin() && entry.user_id != auth.user_id()? {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Time entry belongs to another user"
        )));
    }

    Ok(entry)
}

/// POST /api/time-entries
pub async fn create_time_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateTimeEntryRequest>,
) -> Result<(StatusCode, Json<TimeEntry>), AppError> {
    require_staff(&auth)?;

    let entry = state
        .db
        .create_time_entry(&CreateTimeEntry {
            user_id: auth.user_id()?,
            task_id: req.task_id,
            entry_date: req.entry_date,
            hours: req.hours,
            description: req.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/time-entries
pub async fn list_time_entries(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListTimeEntriesQuery>,
) -> Result<Json<Vec<TimeEntry>>, AppError> {
    require_staff(&auth)?;

    // Non-admins only ever see their own entries.
    let user_id = if auth.is_admin() {
        query.user_id
    } else {
        Some(auth.user_id()?)
    };

    let status = query.status.as_deref().map(parse_entry_status).transpose()?;
    let entries = state
        .db
        .list_time_entries(&ListTimeEntriesFilter {
            user_id,
            task_id: query.task_id,
            status,
            start_date: query.start_date,
            end_date: query.end_date,
            page_size: query.page_size.unwrap_or(50),
            page_token: query.page_token,
        })
        .await?;

    Ok(Json(entries))
}

/// GET /api/time-entries/:id
pub async fn get_time_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(time_entry_id): Path<Uuid>,
) -> Result<Json<TimeEntry>, AppError> {
    require_staff(&auth)?;
    let entry = load_owned_entry(&state, &auth, time_entry_id).await?;
    Ok(Json(entry))
}

/// PUT /api/time-entries/:id
pub async fn update_time_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(time_entry_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTimeEntryRequest>,
) -> Result<Json<TimeEntry>, AppError> {
    require_staff(&auth)?;
    load_owned_entry(&state, &auth, time_entry_id).await?;

    let entry = state
        .db
        .update_time_entry(
            time_entry_id,
            &crate::models::UpdateTimeEntry {
                task_id: req.task_id,
                entry_date: req.entry_date,
                hours: req.hours,
                description: req.description,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Time entry not found")))?;

    Ok(Json(entry))
}

/// DELETE /api/time-entries/:id
pub async fn delete_time_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(time_entry_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_staff(&auth)?;
    let entry = load_owned_entry(&state, &auth, time_entry_id).await?;

    if entry.status != "draft" {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Only draft time entries can be deleted"
        )));
    }

    if state.db.delete_time_entry(time_entry_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Time entry not found")))
    }
}

/// POST /api/time-entries/:id/submit
pub async fn submit_time_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(time_entry_id): Path<Uuid>,
) -> Result<Json<TimeEntry>, AppError> {
    require_staff(&auth)?;
    load_owned_entry(&state, &auth, time_entry_id).await?;

    let entry = state
        .db
        .submit_time_entry(time_entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Time entry not found")))?;

    Ok(Json(entry))
}
