//! Invoice and invoice item models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "sent" => InvoiceStatus::Sent,
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            "cancelled" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    /// Assigned from the invoice number sequence when the invoice is sent.
    pub invoice_number: Option<String>,
    pub status: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub sent_utc: Option<DateTime<Utc>>,
    pub paid_utc: Option<DateTime<Utc>>,
    pub cancelled_utc: Option<DateTime<Utc>>,
}

/// One invoice line, referencing exactly one time entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub invoice_item_id: Uuid,
    pub invoice_id: Uuid,
    pub time_entry_id: Uuid,
    pub description: String,
    pub hours: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub created_utc: DateTime<Utc>,
}

/// Input for generating an invoice from approved time entries.
#[derive(Debug, Clone)]
pub struct GenerateInvoice {
    pub client_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// A line to be written during invoice generation, priced from the
/// owning project's hourly rate.
#[derive(Debug, Clone)]
pub struct CreateInvoiceItem {
    pub time_entry_id: Uuid,
    pub description: String,
    pub hours: Decimal,
    pub unit_price: Decimal,
}

impl CreateInvoiceItem {
    pub fn amount(&self) -> Decimal {
        (self.hours * self.unit_price).round_dp(2)
    }
}

/// Invoice totals: subtotal from line amounts, tax applied on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    /// subtotal = Σ amounts; tax = subtotal × rate; total = subtotal + tax.
    pub fn compute(line_amounts: impl IntoIterator<Item = Decimal>, tax_rate: Decimal) -> Self {
        let subtotal: Decimal = line_amounts.into_iter().sum();
        let tax_amount = (subtotal * tax_rate).round_dp(2);
        InvoiceTotals {
            subtotal,
            tax_amount,
            total: subtotal + tax_amount,
        }
    }
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::Paid,
            InvoiceStatus::Overdue,
            InvoiceStatus::Cancelled,
        ] {
            assert_eq!(InvoiceStatus::from_string(status.as_str()), status);
        }
    }

    #[test]
    fn totals_sum_lines_and_apply_tax() {
        let totals = InvoiceTotals::compute([d("100.00"), d("250.50")], d("0.20"));
        assert_eq!(totals.subtotal, d("350.50"));
        assert_eq!(totals.tax_amount, d("70.10"));
        assert_eq!(totals.total, d("420.60"));
    }

    #[test]
    fn totals_with_zero_tax_rate() {
        let totals = InvoiceTotals::compute([d("80.00")], Decimal::ZERO);
        assert_eq!(totals.subtotal, d("80.00"));
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.total, d("80.00"));
    }

    #[test]
    fn totals_of_empty_selection_are_zero() {
        let totals = InvoiceTotals::compute([], d("0.19"));
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn item_amount_is_hours_times_rate_rounded() {
        let item = CreateInvoiceItem {
            time_entry_id: Uuid::new_v4(),
            description: "Work".to_string(),
            hours: d("1.33"),
            unit_price: d("95.00"),
        };
        assert_eq!(item.amount(), d("126.35"));
    }

    #[test]
    fn invariant_total_equals_subtotal_plus_tax() {
        let totals = InvoiceTotals::compute([d("33.33"), d("66.67"), d("12.01")], d("0.0825"));
        assert_eq!(totals.total, totals.subtotal + totals.tax_amount);
    }
}
