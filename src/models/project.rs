//! Project model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub project_id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Rate applied to every time entry billed under this project.
    pub hourly_rate: Decimal,
    pub archived: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a project.
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: Decimal,
}

/// Input for updating a project.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub archived: Option<bool>,
}
