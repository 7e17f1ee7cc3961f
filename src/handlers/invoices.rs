//! Invoice lifecycle: generate, send, pay, cancel, delete, plus the
//! client-portal reads and the PDF download.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::dtos::invoices::{GenerateInvoiceRequest, InvoiceWithItems, ListInvoicesQuery};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::{GenerateInvoice, Invoice, InvoiceStatus, ListInvoicesFilter, UserRole};
use crate::services::pdf;
use crate::services::EmailProvider;
use crate::utils::validation::ValidatedJson;
use crate::AppState;

fn parse_invoice_status(s: &str) -> Result<InvoiceStatus, AppError> {
    match s {
        "draft" => Ok(InvoiceStatus::Draft),
        "sent" => Ok(InvoiceStatus::Sent),
        "paid" => Ok(InvoiceStatus::Paid),
        "overdue" => Ok(InvoiceStatus::Overdue),
        "cancelled" => Ok(InvoiceStatus::Cancelled),
        other => Err(AppError::BadRequest(anyhow::anyhow!(
            "Unknown invoice status '{}'",
            other
        ))),
    }
}

/// Load an invoice, applying portal access rules. Staff see every invoice;
/// a client login only sees invoices addressed to its own client record,
/// and never drafts.
async fn load_visible_invoice(
    state: &AppState,
    auth: &AuthUser,
    invoice_id: Uuid,
) -> Result<Invoice, AppError> {
    let invoice = state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    if matches!(auth.role(), UserRole::Client) {
        let client = state
            .db
            .get_client_by_user(auth.user_id()?)
            .await?
            .ok_or_else(|| AppError::Forbidden(anyhow::anyhow!("No client record for user")))?;
        if invoice.client_id != client.client_id || invoice.status == "draft" {
            return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
        }
    }

    Ok(invoice)
}

/// POST /api/invoices
///
/// Generates a draft invoice from the client's approved, unbilled time
/// entries in the period.
pub async fn generate_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<GenerateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceWithItems>), AppError> {
    auth.require_admin()?;

    if req.period_end < req.period_start {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Period end must not be before period start"
        )));
    }

    let invoice = state
        .db
        .generate_invoice(&GenerateInvoice {
            client_id: req.client_id,
            period_start: req.period_start,
            period_end: req.period_end,
            due_date: req.due_date,
            notes: req.notes,
        })
        .await?;
    let items = state.db.get_invoice_items(invoice.invoice_id).await?;

    Ok((StatusCode::CREATED, Json(InvoiceWithItems { invoice, items })))
}

/// GET /api/invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let mut client_id = query.client_id;
    let mut status = query
        .status
        .as_deref()
        .map(parse_invoice_status)
        .transpose()?;

    if matches!(auth.role(), UserRole::Client) {
        let client = state
            .db
            .get_client_by_user(auth.user_id()?)
            .await?
            .ok_or_else(|| AppError::Forbidden(anyhow::anyhow!("No client record for user")))?;
        client_id = Some(client.client_id);
        // Drafts are internal; a portal login never sees them.
        if matches!(status, Some(InvoiceStatus::Draft)) {
            status = None;
        }
    }

    let mut invoices = state
        .db
        .list_invoices(&ListInvoicesFilter {
            status,
            client_id,
            start_date: query.start_date,
            end_date: query.end_date,
            page_size: query.page_size.unwrap_or(50),
            page_token: query.page_token,
        })
        .await?;

    if matches!(auth.role(), UserRole::Client) {
        invoices.retain(|inv| inv.status != "draft");
    }

    Ok(Json(invoices))
}

/// GET /api/invoices/:id
pub async fn get_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceWithItems>, AppError> {
    let invoice = load_visible_invoice(&state, &auth, invoice_id).await?;
    let items = state.db.get_invoice_items(invoice_id).await?;

    Ok(Json(InvoiceWithItems { invoice, items }))
}

/// GET /api/invoices/:id/pdf
pub async fn download_invoice_pdf(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = load_visible_invoice(&state, &auth, invoice_id).await?;
    let client = state
        .db
        .get_client(invoice.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;
    let items = state.db.get_invoice_items(invoice_id).await?;

    let document = pdf::render_invoice(&client, &invoice, &items);
    let filename = invoice
        .invoice_number
        .clone()
        .unwrap_or_else(|| format!("draft-{}", invoice.invoice_id));

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.txt\"", filename),
            ),
        ],
        document,
    ))
}

/// POST /api/invoices/:id/send
///
/// Assigns the sequential invoice number and issue date, moves the invoice
/// to sent, and emails the client.
pub async fn send_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    auth.require_admin()?;

    let today = Utc::now().date_naive();
    let default_due = today + Duration::days(state.config.invoicing.default_due_days);
    let invoice = state
        .db
        .send_invoice(invoice_id, today, default_due)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    if let Ok(Some(client)) = state.db.get_client(invoice.client_id).await {
        if let Err(e) = state.email.send_invoice_email(&client, &invoice).await {
            // The invoice is already sent; a mail failure must not roll
            // that back.
            tracing::warn!(invoice_id = %invoice.invoice_id, error = %e, "Invoice email failed");
        }
    }

    Ok(Json(invoice))
}

/// POST /api/invoices/:id/pay
pub async fn mark_invoice_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    auth.require_admin()?;

    let invoice = state
        .db
        .mark_invoice_paid(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(Json(invoice))
}

/// POST /api/invoices/:id/cancel
pub async fn cancel_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    auth.require_admin()?;

    let invoice = state
        .db
        .cancel_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(Json(invoice))
}

/// DELETE /api/invoices/:id
pub async fn delete_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;

    if state.db.delete_invoice(invoice_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")))
    }
}
