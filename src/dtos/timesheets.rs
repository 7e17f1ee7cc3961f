use crate::models::{TimeEntry, Timesheet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTimesheetRequest {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ListTimesheetsQuery {
    pub status: Option<String>,
    /// Admin-only filter; others always see their own timesheets.
    pub user_id: Option<uuid::Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TimesheetWithEntries {
    #[serde(flatten)]
    pub timesheet: Timesheet,
    pub entries: Vec<TimeEntry>,
}
