//! Domain models for timebill.

mod client;
mod invoice;
mod project;
mod task;
mod time_entry;
mod timesheet;
mod user;

pub use client::{Client, CreateClient, UpdateClient};
pub use invoice::{
    CreateInvoiceItem, GenerateInvoice, Invoice, InvoiceItem, InvoiceStatus, InvoiceTotals,
    ListInvoicesFilter,
};
pub use project::{CreateProject, Project, UpdateProject};
pub use task::{CreateTask, Task, TaskStatus, UpdateTask};
pub use time_entry::{
    CreateTimeEntry, ListTimeEntriesFilter, TimeEntry, TimeEntryStatus, UpdateTimeEntry,
};
pub use timesheet::{CreateTimesheet, Timesheet, TimesheetStatus};
pub use user::{CreateUser, SanitizedUser, User, UserRole};
