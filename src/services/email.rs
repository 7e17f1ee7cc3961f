use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::error::AppError;
use crate::models::{Client, Invoice};

#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Notify a client that an invoice has been sent to them.
    async fn send_invoice_email(&self, client: &Client, invoice: &Invoice)
        -> Result<(), AppError>;
}

/// SMTP-backed email service. Without an SMTP host configured it degrades to
/// a logging stub, which is what tests and local development run against.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<SmtpTransport>,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let mailer = match (&config.host, &config.user, &config.password) {
            (Some(host), Some(user), Some(password)) => {
                let creds = Credentials::new(user.clone(), password.clone());
                let mailer = SmtpTransport::relay(host)
                    .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
                    .credentials(creds)
                    .timeout(Some(Duration::from_secs(10)))
                    .build();
                tracing::info!(host = %host, "Email service initialized with SMTP relay");
                Some(mailer)
            }
            _ => {
                tracing::info!("SMTP not configured, email service running as logging stub");
                None
            }
        };

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
        })
    }

    async fn send_email(&self, to_email: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let Some(mailer) = self.mailer.clone() else {
            tracing::info!(to = %to_email, subject = %subject, "Email stub: skipping delivery");
            return Ok(());
        };

        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::InternalError(e.into()))?;

        // Send email in blocking thread pool to avoid blocking async runtime
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(to = %to_email, error = %e, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_invoice_email(
        &self,
        client: &Client,
        invoice: &Invoice,
    ) -> Result<(), AppError> {
        let number = invoice.invoice_number.as_deref().unwrap_or("(draft)");
        let subject = format!("Invoice {}", number);
        let due = invoice
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "on receipt".to_string());
        let body = format!(
            "Dear {},\n\n\
             Please find invoice {} for the period {} to {}.\n\
             Amount due: {} (subtotal {}, tax {}).\n\
             Payment due: {}.\n\n\
             Thank you for your business.\n",
            client.name,
            number,
            invoice.period_start,
            invoice.period_end,
            invoice.total,
            invoice.subtotal,
            invoice.tax_amount,
            due,
        );

        self.send_email(&client.email, &subject, &body).await
    }
}
