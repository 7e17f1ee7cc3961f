//! Project CRUD.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::dtos::projects::{CreateProjectRequest, ListProjectsQuery, UpdateProjectRequest};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::{CreateProject, Project, UpdateProject};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    auth.require_admin()?;

    let project = state
        .db
        .create_project(&CreateProject {
            client_id: req.client_id,
            name: req.name,
            description: req.description,
            hourly_rate: req.hourly_rate,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<Vec<Project>>, AppError> {
    let projects = state
        .db
        .list_projects(query.client_id, query.include_archived)
        .await?;
    Ok(Json(projects))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    let project = state
        .db
        .get_project(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project not found")))?;
    Ok(Json(project))
}

/// PUT /api/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    auth.require_admin()?;

    let project = state
        .db
        .update_project(
            project_id,
            &UpdateProject {
                name: req.name,
                description: req.description,
                hourly_rate: req.hourly_rate,
                archived: req.archived,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project not found")))?;

    Ok(Json(project))
}

/// DELETE /api/projects/:id
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;

    if state.db.delete_project(project_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Project not found")))
    }
}
