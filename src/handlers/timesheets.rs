//! Timesheet lifecycle: create, submit, approve or reject, delete.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::dtos::timesheets::{CreateTimesheetRequest, ListTimesheetsQuery, TimesheetWithEntries};
use crate::error::AppError;
use crate::handlers::require_staff;
use crate::middleware::AuthUser;
use crate::models::{CreateTimesheet, Timesheet, TimesheetStatus};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

fn parse_timesheet_status(s: &str) -> Result<TimesheetStatus, AppError> {
    match s {
        "draft" => Ok(TimesheetStatus::Draft),
        "submitted" => Ok(TimesheetStatus::Submitted),
        "approved" => Ok(TimesheetStatus::Approved),
        "rejected" => Ok(TimesheetStatus::Rejected),
        other => Err(AppError::BadRequest(anyhow::anyhow!(
            "Unknown timesheet status '{}'",
            other
        ))),
    }
}

async fn load_owned_timesheet(
    state: &AppState,
    auth: &AuthUser,
    timesheet_id: Uuid,
) -> Result<Timesheet, AppError> {
    let timesheet = state
        .db
        .get_timesheet(timesheet_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Timesheet not found")))?;

    if !auth.is_admin() && timesheet.user_id != auth.user_id()? {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Timesheet belongs to another user"
        )));
    }

    Ok(timesheet)
}

/// POST /api/timesheets
///
/// Creates a draft timesheet for the caller and attaches their unattached
/// draft entries within the period.
pub async fn create_timesheet(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateTimesheetRequest>,
) -> Result<(StatusCode, Json<Timesheet>), AppError> {
    require_staff(&auth)?;

    if req.period_end < req.period_start {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Period end must not be before period start"
        )));
    }

    let timesheet = state
        .db
        .create_timesheet(&CreateTimesheet {
            user_id: auth.user_id()?,
            period_start: req.period_start,
            period_end: req.period_end,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(timesheet)))
}

/// GET /api/timesheets
pub async fn list_timesheets(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListTimesheetsQuery>,
) -> Result<Json<Vec<Timesheet>>, AppError> {
    require_staff(&auth)?;

    let user_id = if auth.is_admin() {
        query.user_id
    } else {
        Some(auth.user_id()?)
    };

    let status = query
        .status
        .as_deref()
        .map(parse_timesheet_status)
        .transpose()?;
    let timesheets = state.db.list_timesheets(user_id, status).await?;

    Ok(Json(timesheets))
}

/// GET /api/timesheets/:id
pub async fn get_timesheet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(timesheet_id): Path<Uuid>,
) -> Result<Json<TimesheetWithEntries>, AppError> {
    require_staff(&auth)?;
    let timesheet = load_owned_timesheet(&state, &auth, timesheet_id).await?;
    let entries = state.db.get_timesheet_entries(timesheet_id).await?;

    Ok(Json(TimesheetWithEntries { timesheet, entries }))
}

/// POST /api/timesheets/:id/submit
pub async fn submit_timesheet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(timesheet_id): Path<Uuid>,
) -> Result<Json<Timesheet>, AppError> {
    require_staff(&auth)?;
    load_owned_timesheet(&state, &auth, timesheet_id).await?;

    let timesheet = state
        .db
        .submit_timesheet(timesheet_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Timesheet not found")))?;

    Ok(Json(timesheet))
}

/// POST /api/timesheets/:id/approve
pub async fn approve_timesheet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(timesheet_id): Path<Uuid>,
) -> Result<Json<Timesheet>, AppError> {
    auth.require_admin()?;

    let timesheet = state
        .db
        .decide_timesheet(timesheet_id, auth.user_id()?, true)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Timesheet not found")))?;

    Ok(Json(timesheet))
}

/// POST /api/timesheets/:id/reject
pub async fn reject_timesheet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(timesheet_id): Path<Uuid>,
) -> Result<Json<Timesheet>, AppError> {
    auth.require_admin()?;

    let timesheet = state
        .db
        .decide_timesheet(timesheet_id, auth.user_id()?, false)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Timesheet not found")))?;

    Ok(Json(timesheet))
}

/// DELETE /api/timesheets/:id
pub async fn delete_timesheet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(timesheet_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_staff(&auth)?;
    load_owned_timesheet(&state, &auth, timesheet_id).await?;

    if state.db.delete_timesheet(timesheet_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Timesheet not found")))
    }
}
