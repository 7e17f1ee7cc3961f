use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTimeEntryRequest {
    pub task_id: Uuid,
    pub entry_date: NaiveDate,

    #[validate(custom(function = crate::dtos::validate_positive))]
    pub hours: Decimal,

    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTimeEntryRequest {
    pub task_id: Option<Uuid>,
    pub entry_date: Option<NaiveDate>,

    #[validate(custom(function = crate::dtos::validate_positive))]
    pub hours: Option<Decimal>,

    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListTimeEntriesQuery {
    /// Admins may filter by any user; others are pinned to themselves.
    pub user_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page_size: Option<i32>,
    pub page_token: Option<Uuid>,
}
