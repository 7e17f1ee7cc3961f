//! Time entry model and status lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Time entry lifecycle: draft → submitted → approved/rejected, and billed
/// once an invoice picks the entry up. Rejected entries go back to draft on
/// edit so they can be resubmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeEntryStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Billed,
}

impl TimeEntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeEntryStatus::Draft => "draft",
            TimeEntryStatus::Submitted => "submitted",
            TimeEntryStatus::Approved => "approved",
            TimeEntryStatus::Rejected => "rejected",
            TimeEntryStatus::Billed => "billed",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "submitted" => TimeEntryStatus::Submitted,
            "approved" => TimeEntryStatus::Approved,
            "rejected" => TimeEntryStatus::Rejected,
            "billed" => TimeEntryStatus::Billed,
            _ => TimeEntryStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimeEntry {
    pub time_entry_id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub timesheet_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub hours: Decimal,
    pub description: Option<String>,
    pub status: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a time entry.
#[derive(Debug, Clone)]
pub struct CreateTimeEntry {
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub entry_date: NaiveDate,
    pub hours: Decimal,
    pub description: Option<String>,
}

/// Input for updating a time entry (draft or rejected only).
#[derive(Debug, Clone, Default)]
pub struct UpdateTimeEntry {
    pub task_id: Option<Uuid>,
    pub entry_date: Option<NaiveDate>,
    pub hours: Option<Decimal>,
    pub description: Option<String>,
}

/// Filter parameters for listing time entries.
#[derive(Debug, Clone, Default)]
pub struct ListTimeEntriesFilter {
    /// Restrict to a single owner; `None` only for admin listings.
    pub user_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub status: Option<TimeEntryStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            TimeEntryStatus::Draft,
            TimeEntryStatus::Submitted,
            TimeEntryStatus::Approved,
            TimeEntryStatus::Rejected,
            TimeEntryStatus::Billed,
        ] {
            assert_eq!(TimeEntryStatus::from_string(status.as_str()), status);
        }
    }
}
