use crate::error::AppError;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub service_name: String,
    pub log_level: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub invoicing: InvoicingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_minutes: i64,
}

/// SMTP settings. When `host` is unset the email service falls back to a
/// logging stub, which is what tests and local development use.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    /// Default payment terms, used when a generate request carries no due date.
    pub default_due_days: i64,
    /// Interval for the overdue sweep background task.
    pub overdue_sweep_interval_seconds: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(AppConfig {
            service_name: get_env("SERVICE_NAME", Some("timebill"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            port: get_env("PORT", Some("8080"), is_prod)?
                .parse()
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid PORT: {}", e)))?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "Invalid DATABASE_MAX_CONNECTIONS: {}",
                            e
                        ))
                    })?,
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "Invalid DATABASE_MIN_CONNECTIONS: {}",
                            e
                        ))
                    })?,
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", Some("dev-secret-change-me"), is_prod)?,
                access_token_expiry_minutes: get_env(
                    "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "Invalid JWT_ACCESS_TOKEN_EXPIRY_MINUTES: {}",
                        e
                    ))
                })?,
            },
            smtp: SmtpConfig {
                host: env::var("SMTP_HOST").ok(),
                user: env::var("SMTP_USER").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
                from_email: get_env("SMTP_FROM_EMAIL", Some("billing@localhost"), is_prod)?,
            },
            invoicing: InvoicingConfig {
                default_due_days: get_env("INVOICE_DEFAULT_DUE_DAYS", Some("30"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "Invalid INVOICE_DEFAULT_DUE_DAYS: {}",
                            e
                        ))
                    })?,
                overdue_sweep_interval_seconds: get_env(
                    "INVOICE_OVERDUE_SWEEP_INTERVAL_SECONDS",
                    Some("3600"),
                    is_prod,
                )?
                .parse()
                .map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "Invalid INVOICE_OVERDUE_SWEEP_INTERVAL_SECONDS: {}",
                        e
                    ))
                })?,
            },
        })
    }

    /// Fixed configuration for the integration test harness; the caller
    /// overrides the database url and port.
    pub fn load_for_tests() -> Self {
        AppConfig {
            service_name: "timebill-test".to_string(),
            log_level: "warn".to_string(),
            port: 0,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 5,
                min_connections: 1,
            },
            jwt: JwtConfig {
                secret: "test-secret-test-secret".to_string(),
                access_token_expiry_minutes: 60,
            },
            smtp: SmtpConfig {
                host: None,
                user: None,
                password: None,
                from_email: "billing@localhost".to_string(),
            },
            invoicing: InvoicingConfig {
                default_due_days: 30,
                overdue_sweep_interval_seconds: 3600,
            },
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}
