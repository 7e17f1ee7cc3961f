//! Invoice document rendering.
//!
//! Placeholder for real PDF generation: renders a deterministic plain-text
//! invoice document. The handler serves it with a download disposition so
//! the API surface will not change when a PDF backend lands.

use crate::models::{Client, Invoice, InvoiceItem};

pub fn render_invoice(client: &Client, invoice: &Invoice, items: &[InvoiceItem]) -> Vec<u8> {
    let mut doc = String::new();

    doc.push_str(&format!(
        "INVOICE {}\n",
        invoice.invoice_number.as_deref().unwrap_or("(draft)")
    ));
    doc.push_str(&format!("Status: {}\n", invoice.status));
    doc.push_str(&format!(
        "Period: {} to {}\n",
        invoice.period_start, invoice.period_end
    ));
    if let Some(issue_date) = invoice.issue_date {
        doc.push_str(&format!("Issued: {}\n", issue_date));
    }
    if let Some(due_date) = invoice.due_date {
        doc.push_str(&format!("Due: {}\n", due_date));
    }

    doc.push_str(&format!("\nBill to: {}\n", client.name));
    for line in [&client.address_line1, &client.address_line2, &client.city].into_iter().flatten() {
        doc.push_str(&format!("         {}\n", line));
    }

    doc.push_str("\n  Hours    Rate      Amount  Description\n");
    doc.push_str("  ------------------------------------------\n");
    for item in items {
        doc.push_str(&format!(
            "  {:>5}  {:>6}  {:>10}  {}\n",
            item.hours, item.unit_price, item.amount, item.description
        ));
    }

    doc.push_str(&format!("\n  Subtotal: {:>10}\n", invoice.subtotal));
    doc.push_str(&format!(
        "  Tax ({}%): {:>9}\n",
        invoice.tax_rate * rust_decimal::Decimal::ONE_HUNDRED,
        invoice.tax_amount
    ));
    doc.push_str(&format!("  Total:    {:>10}\n", invoice.total));

    if let Some(ref notes) = invoice.notes {
        doc.push_str(&format!("\nNotes: {}\n", notes));
    }

    doc.into_bytes()
}
