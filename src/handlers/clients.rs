//! Client CRUD.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::dtos::clients::{CreateClientRequest, UpdateClientRequest};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::{Client, CreateClient, UpdateClient};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

/// POST /api/clients
pub async fn create_client(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    auth.require_admin()?;

    let client = state
        .db
        .create_client(&CreateClient {
            user_id: req.user_id,
            name: req.name,
            email: req.email,
            address_line1: req.address_line1,
            address_line2: req.address_line2,
            city: req.city,
            country: req.country,
            tax_rate: req.tax_rate,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /api/clients
pub async fn list_clients(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Client>>, AppError> {
    auth.require_admin()?;
    let clients = state.db.list_clients().await?;
    Ok(Json(clients))
}

/// GET /api/clients/:id
pub async fn get_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    auth.require_admin()?;
    let client = state
        .db
        .get_client(client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;
    Ok(Json(client))
}

/// PUT /api/clients/:id
pub async fn update_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateClientRequest>,
) -> Result<Json<Client>, AppError> {
    auth.require_admin()?;

    let client = state
        .db
        .update_client(
            client_id,
            &UpdateClient {
                user_id: req.user_id,
                name: req.name,
                email: req.email,
                address_line1: req.address_line1,
                address_line2: req.address_line2,
                city: req.city,
                country: req.country,
                tax_rate: req.tax_rate,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    Ok(Json(client))
}

/// DELETE /api/clients/:id
pub async fn delete_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;

    if state.db.delete_client(client_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Client not found")))
    }
}
