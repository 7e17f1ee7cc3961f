//! Application assembly: connect services, bind the listener, and run the
//! overdue sweep in the background.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::{Database, EmailService, JwtService};
use crate::{build_router, AppState};

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: AppConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        db.run_migrations().await?;

        let jwt = JwtService::new(&config.jwt)?;
        let email = EmailService::new(&config.smtp)?;

        let state = AppState {
            config: config.clone(),
            db,
            jwt,
            email,
        };

        let app = build_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        info!(port = port, "Listening");

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Spawn the periodic sweep that moves sent invoices past their due
    /// date to overdue.
    pub fn spawn_overdue_sweep(&self) {
        let db = self.state.db.clone();
        let interval_seconds = self.state.config.invoicing.overdue_sweep_interval_seconds;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
            loop {
                ticker.tick().await;
                if let Err(e) = db.mark_overdue_invoices().await {
                    error!(error = %e, "Overdue sweep failed");
                }
            }
        });
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
