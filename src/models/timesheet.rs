//! Timesheet model: a user's time entries grouped over a period, submitted
//! for approval as a unit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimesheetStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl TimesheetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimesheetStatus::Draft => "draft",
            TimesheetStatus::Submitted => "submitted",
            TimesheetStatus::Approved => "approved",
            TimesheetStatus::Rejected => "rejected",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "submitted" => TimesheetStatus::Submitted,
            "approved" => TimesheetStatus::Approved,
            "rejected" => TimesheetStatus::Rejected,
            _ => TimesheetStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Timesheet {
    pub timesheet_id: Uuid,
    pub user_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: String,
    pub submitted_utc: Option<DateTime<Utc>>,
    pub decided_utc: Option<DateTime<Utc>>,
    /// Admin who approved or rejected the sheet.
    pub decided_by: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a timesheet.
#[derive(Debug, Clone)]
pub struct CreateTimesheet {
    pub user_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            TimesheetStatus::Draft,
            TimesheetStatus::Submitted,
            TimesheetStatus::Approved,
            TimesheetStatus::Rejected,
        ] {
            assert_eq!(TimesheetStatus::from_string(status.as_str()), status);
        }
    }
}
