pub mod auth;
pub mod clients;
pub mod invoices;
pub mod projects;
pub mod tasks;
pub mod time_entries;
pub mod timesheets;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_positive"))
    }
}

pub(crate) fn validate_tax_rate(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() || *value > Decimal::ONE {
        Err(ValidationError::new("tax_rate_out_of_range"))
    } else {
        Ok(())
    }
}
