pub mod auth;
pub mod clients;
pub mod health;
pub mod invoices;
pub mod projects;
pub mod tasks;
pub mod time_entries;
pub mod timesheets;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::UserRole;

/// Client-portal logins are read-only; worker-facing mutations (time
/// entries, timesheets) go through this check. Catalog and billing
/// mutations are admin-gated instead.
pub(crate) fn require_staff(auth: &AuthUser) -> Result<(), AppError> {
    match auth.role() {
        UserRole::Admin | UserRole::User => Ok(()),
        UserRole::Client => Err(AppError::Forbidden(anyhow::anyhow!(
            "Client accounts are read-only"
        ))),
    }
}
