use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    pub client_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = crate::dtos::validate_positive))]
    pub hourly_rate: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,

    pub description: Option<String>,

    #[validate(custom(function = crate::dtos::validate_positive))]
    pub hourly_rate: Option<Decimal>,

    pub archived: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub include_archived: bool,
}
