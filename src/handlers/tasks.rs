//! Task CRUD.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::dtos::tasks::{CreateTaskRequest, ListTasksQuery, UpdateTaskRequest};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::{CreateTask, Task, TaskStatus, UpdateTask};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

fn parse_task_status(s: &str) -> Result<TaskStatus, AppError> {
    match s {
        "open" => Ok(TaskStatus::Open),
        "done" => Ok(TaskStatus::Done),
        other => Err(AppError::BadRequest(anyhow::anyhow!(
            "Unknown task status '{}'",
            other
        ))),
    }
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    auth.require_admin()?;

    let task = state
        .db
        .create_task(&CreateTask {
            project_id: req.project_id,
            name: req.name,
            description: req.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.db.list_tasks(query.project_id).await?;
    Ok(Json(tasks))
}

/// GET /api/tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    let task = state
        .db
        .get_task(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task not found")))?;
    Ok(Json(task))
}

/// PUT /api/tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    auth.require_admin()?;

    let status = req.status.as_deref().map(parse_task_status).transpose()?;
    let task = state
        .db
        .update_task(
            task_id,
            &UpdateTask {
                name: req.name,
                description: req.description,
                status,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task not found")))?;

    Ok(Json(task))
}

/// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;

    if state.db.delete_task(task_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Task not found")))
    }
}
