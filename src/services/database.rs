//! Database service for timebill.
//!
//! All SQL lives here. Workflow operations that touch several tables
//! (timesheet decisions, invoice generation and cancellation) run inside a
//! single transaction so the cross-table invariants hold.

use crate::error::AppError;
use crate::models::{
    Client, CreateClient, CreateInvoiceItem, CreateProject, CreateTask, CreateTimeEntry,
    CreateTimesheet, CreateUser, GenerateInvoice, Invoice, InvoiceItem, InvoiceTotals,
    ListInvoicesFilter, ListTimeEntriesFilter, Project, Task, TimeEntry, TimeEntryStatus,
    Timesheet, TimesheetStatus, UpdateClient, UpdateProject, UpdateTask, UpdateTimeEntry, User,
};
use crate::services::metrics::{
    DB_QUERY_DURATION, INVOICES_TOTAL, INVOICE_AMOUNT_TOTAL, TIMESHEET_DECISIONS_TOTAL,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "invoice_id, client_id, invoice_number, status, period_start, \
     period_end, issue_date, due_date, subtotal, tax_rate, tax_amount, total, notes, \
     created_utc, sent_utc, paid_utc, cancelled_utc";

const TIME_ENTRY_COLUMNS: &str = "time_entry_id, user_id, task_id, timesheet_id, entry_date, \
     hours, description, status, created_utc, updated_utc";

const TIMESHEET_COLUMNS: &str = "timesheet_id, user_id, period_start, period_end, status, \
     submitted_utc, decided_utc, decided_by, created_utc";

/// An approved, unbilled time entry joined with the rate it bills at.
#[derive(Debug, Clone, FromRow)]
struct BillableEntry {
    time_entry_id: Uuid,
    entry_date: NaiveDate,
    hours: Decimal,
    description: Option<String>,
    task_name: String,
    hourly_rate: Decimal,
}

impl BillableEntry {
    fn into_item(self) -> CreateInvoiceItem {
        let description = match self.description {
            Some(ref text) if !text.is_empty() => {
                format!("{} ({}): {}", self.task_name, self.entry_date, text)
            }
            _ => format!("{} ({})", self.task_name, self.entry_date),
        };
        CreateInvoiceItem {
            time_entry_id: self.time_entry_id,
            description,
            hours: self.hours,
            unit_price: self.hourly_rate,
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // User Operations
    // -------------------------------------------------------------------------

    /// Create a new user.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(&self, input: &CreateUser) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user_id = Uuid::new_v4();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, email, password_hash, name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, email, password_hash, name, role, created_utc
            "#,
        )
        .bind(user_id)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.name)
        .bind(input.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "A user with email '{}' already exists",
                    input.email
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        timer.observe_duration();

        info!(user_id = %user.user_id, "User created");

        Ok(user)
    }

    /// Get a user by ID.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, name, role, created_utc
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    /// Get a user by email (for login).
    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user_by_email"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, name, role, created_utc
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get user by email: {}", e))
        })?;

        timer.observe_duration();

        Ok(user)
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    /// Create a new client.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client_id = Uuid::new_v4();
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (client_id, user_id, name, email, address_line1, address_line2,
                city, country, tax_rate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING client_id, user_id, name, email, address_line1, address_line2, city,
                country, tax_rate, created_utc
            "#,
        )
        .bind(client_id)
        .bind(input.user_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.address_line1)
        .bind(&input.address_line2)
        .bind(&input.city)
        .bind(&input.country)
        .bind(input.tax_rate)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create client: {}", e)))?;

        timer.observe_duration();

        info!(client_id = %client.client_id, "Client created");

        Ok(client)
    }

    /// Get a client by ID.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, user_id, name, email, address_line1, address_line2, city,
                country, tax_rate, created_utc
            FROM clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// Get the client record linked to a portal login, if any.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_client_by_user(&self, user_id: Uuid) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, user_id, name, email, address_line1, address_line2, city,
                country, tax_rate, created_utc
            FROM clients
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get client by user: {}", e))
        })?;

        Ok(client)
    }

    /// List all clients.
    #[instrument(skip(self))]
    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, user_id, name, email, address_line1, address_line2, city,
                country, tax_rate, created_utc
            FROM clients
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        timer.observe_duration();

        Ok(clients)
    }

    /// Update a client.
    #[instrument(skip(self, input), fields(client_id = %client_id))]
    pub async fn update_client(
        &self,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET user_id = COALESCE($2, user_id),
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                address_line1 = COALESCE($5, address_line1),
                address_line2 = COALESCE($6, address_line2),
                city = COALESCE($7, city),
                country = COALESCE($8, country),
                tax_rate = COALESCE($9, tax_rate)
            WHERE client_id = $1
            RETURNING client_id, user_id, name, email, address_line1, address_line2, city,
                country, tax_rate, created_utc
            "#,
        )
        .bind(client_id)
        .bind(input.user_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.address_line1)
        .bind(&input.address_line2)
        .bind(&input.city)
        .bind(&input.country)
        .bind(input.tax_rate)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// Delete a client (cascades to projects and tasks).
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn delete_client(&self, client_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE client_id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict(anyhow::anyhow!(
                        "Client has invoiced time entries and cannot be deleted"
                    ))
                }
                _ => AppError::DatabaseError(anyhow::anyhow!("Failed to delete client: {}", e)),
            })?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Project Operations
    // -------------------------------------------------------------------------

    /// Create a new project.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create_project(&self, input: &CreateProject) -> Result<Project, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_project"])
            .start_timer();

        let project_id = Uuid::new_v4();
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (project_id, client_id, name, description, hourly_rate)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING project_id, client_id, name, description, hourly_rate, archived, created_utc
            "#,
        )
        .bind(project_id)
        .bind(input.client_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.hourly_rate)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Client does not exist"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create project: {}", e)),
        })?;

        timer.observe_duration();

        info!(project_id = %project.project_id, "Project created");

        Ok(project)
    }

    /// Get a project by ID.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn get_project(&self, project_id: Uuid) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT project_id, client_id, name, description, hourly_rate, archived, created_utc
            FROM projects
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get project: {}", e)))?;

        Ok(project)
    }

    /// List projects, optionally restricted to a client.
    #[instrument(skip(self))]
    pub async fn list_projects(
        &self,
        client_id: Option<Uuid>,
        include_archived: bool,
    ) -> Result<Vec<Project>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_projects"])
            .start_timer();

        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT project_id, client_id, name, description, hourly_rate, archived, created_utc
            FROM projects
            WHERE ($1::uuid IS NULL OR client_id = $1)
              AND ($2::bool = TRUE OR archived = FALSE)
            ORDER BY name
            "#,
        )
        .bind(client_id)
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list projects: {}", e)))?;

        timer.observe_duration();

        Ok(projects)
    }

    /// Update a project.
    #[instrument(skip(self, input), fields(project_id = %project_id))]
    pub async fn update_project(
        &self,
        project_id: Uuid,
        input: &UpdateProject,
    ) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                hourly_rate = COALESCE($4, hourly_rate),
                archived = COALESCE($5, archived)
            WHERE project_id = $1
            RETURNING project_id, client_id, name, description, hourly_rate, archived, created_utc
            "#,
        )
        .bind(project_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.hourly_rate)
        .bind(input.archived)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update project: {}", e))
        })?;

        Ok(project)
    }

    /// Delete a project.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn delete_project(&self, project_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict(anyhow::anyhow!(
                        "Project has invoiced time entries and cannot be deleted"
                    ))
                }
                _ => AppError::DatabaseError(anyhow::anyhow!("Failed to delete project: {}", e)),
            })?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Task Operations
    // -------------------------------------------------------------------------

    /// Create a new task.
    #[instrument(skip(self, input), fields(project_id = %input.project_id))]
    pub async fn create_task(&self, input: &CreateTask) -> Result<Task, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_task"])
            .start_timer();

        let task_id = Uuid::new_v4();
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (task_id, project_id, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING task_id, project_id, name, description, status, created_utc
            "#,
        )
        .bind(task_id)
        .bind(input.project_id)
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Project does not exist"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create task: {}", e)),
        })?;

        timer.observe_duration();

        info!(task_id = %task.task_id, "Task created");

        Ok(task)
    }

    /// Get a task by ID.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT task_id, project_id, name, description, status, created_utc
            FROM tasks
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get task: {}", e)))?;

        Ok(task)
    }

    /// List tasks, optionally restricted to a project.
    #[instrument(skip(self))]
    pub async fn list_tasks(&self, project_id: Option<Uuid>) -> Result<Vec<Task>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_tasks"])
            .start_timer();

        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT task_id, project_id, name, description, status, created_utc
            FROM tasks
            WHERE ($1::uuid IS NULL OR project_id = $1)
            ORDER BY created_utc
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list tasks: {}", e)))?;

        timer.observe_duration();

        Ok(tasks)
    }

    /// Update a task.
    #[instrument(skip(self, input), fields(task_id = %task_id))]
    pub async fn update_task(
        &self,
        task_id: Uuid,
        input: &UpdateTask,
    ) -> Result<Option<Task>, AppError> {
        let status = input.status.map(|s| s.as_str().to_string());
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status)
            WHERE task_id = $1
            RETURNING task_id, project_id, name, description, status, created_utc
            "#,
        )
        .bind(task_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update task: {}", e)))?;

        Ok(task)
    }

    /// Delete a task.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn delete_task(&self, task_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE task_id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict(anyhow::anyhow!(
                        "Task has invoiced time entries and cannot be deleted"
                    ))
                }
                _ => AppError::DatabaseError(anyhow::anyhow!("Failed to delete task: {}", e)),
            })?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Time Entry Operations
    // -------------------------------------------------------------------------

    /// Create a new draft time entry.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, task_id = %input.task_id))]
    pub async fn create_time_entry(&self, input: &CreateTimeEntry) -> Result<TimeEntry, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_time_entry"])
            .start_timer();

        let time_entry_id = Uuid::new_v4();
        let entry = sqlx::query_as::<_, TimeEntry>(&format!(
            r#"
            INSERT INTO time_entries (time_entry_id, user_id, task_id, entry_date, hours, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TIME_ENTRY_COLUMNS}
            "#,
        ))
        .bind(time_entry_id)
        .bind(input.user_id)
        .bind(input.task_id)
        .bind(input.entry_date)
        .bind(input.hours)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Task does not exist"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create time entry: {}", e)),
        })?;

        timer.observe_duration();

        info!(time_entry_id = %entry.time_entry_id, "Time entry created");

        Ok(entry)
    }

    /// Get a time entry by ID.
    #[instrument(skip(self), fields(time_entry_id = %time_entry_id))]
    pub async fn get_time_entry(
        &self,
        time_entry_id: Uuid,
    ) -> Result<Option<TimeEntry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_time_entry"])
            .start_timer();

        let entry = sqlx::query_as::<_, TimeEntry>(&format!(
            r#"
            SELECT {TIME_ENTRY_COLUMNS}
            FROM time_entries
            WHERE time_entry_id = $1
            "#,
        ))
        .bind(time_entry_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get time entry: {}", e)))?;

        timer.observe_duration();

        Ok(entry)
    }

    /// List time entries matching a filter.
    #[instrument(skip(self, filter))]
    pub async fn list_time_entries(
        &self,
        filter: &ListTimeEntriesFilter,
    ) -> Result<Vec<TimeEntry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_time_entries"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;
        let status_str = filter.status.map(|s| s.as_str().to_string());

        let entries = if let Some(cursor) = filter.page_token {
            sqlx::query_as::<_, TimeEntry>(&format!(
                r#"
                SELECT {TIME_ENTRY_COLUMNS}
                FROM time_entries
                WHERE ($1::uuid IS NULL OR user_id = $1)
                  AND ($2::uuid IS NULL OR task_id = $2)
                  AND ($3::varchar IS NULL OR status = $3)
                  AND ($4::date IS NULL OR entry_date >= $4)
                  AND ($5::date IS NULL OR entry_date <= $5)
                  AND time_entry_id > $6
                ORDER BY time_entry_id
                LIMIT $7
                "#,
            ))
            .bind(filter.user_id)
            .bind(filter.task_id)
            .bind(&status_str)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(cursor)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, TimeEntry>(&format!(
                r#"
                SELECT {TIME_ENTRY_COLUMNS}
                FROM time_entries
                WHERE ($1::uuid IS NULL OR user_id = $1)
                  AND ($2::uuid IS NULL OR task_id = $2)
                  AND ($3::varchar IS NULL OR status = $3)
                  AND ($4::date IS NULL OR entry_date >= $4)
                  AND ($5::date IS NULL OR entry_date <= $5)
                ORDER BY time_entry_id
                LIMIT $6
                "#,
            ))
            .bind(filter.user_id)
            .bind(filter.task_id)
            .bind(&status_str)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list time entries: {}", e))
        })?;

        timer.observe_duration();

        Ok(entries)
    }

    /// Update a time entry. Only draft or rejected entries can be edited;
    /// editing a rejected entry moves it back to draft for resubmission.
    #[instrument(skip(self, input), fields(time_entry_id = %time_entry_id))]
    pub async fn update_time_entry(
        &self,
        time_entry_id: Uuid,
        input: &UpdateTimeEntry,
    ) -> Result<Option<TimeEntry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_time_entry"])
            .start_timer();

        let existing = self.get_time_entry(time_entry_id).await?;
        match existing {
            Some(ref entry)
                if matches!(
                    TimeEntryStatus::from_string(&entry.status),
                    TimeEntryStatus::Draft | TimeEntryStatus::Rejected
                ) => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only draft or rejected time entries can be updated"
                )))
            }
            None => return Ok(None),
        };

        let entry = sqlx::query_as::<_, TimeEntry>(&format!(
            r#"
            UPDATE time_entries
            SET task_id = COALESCE($2, task_id),
                entry_date = COALESCE($3, entry_date),
                hours = COALESCE($4, hours),
                description = COALESCE($5, description),
                status = 'draft',
                updated_utc = NOW()
            WHERE time_entry_id = $1
            RETURNING {TIME_ENTRY_COLUMNS}
            "#,
        ))
        .bind(time_entry_id)
        .bind(input.task_id)
        .bind(input.entry_date)
        .bind(input.hours)
        .bind(&input.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update time entry: {}", e))
        })?;

        timer.observe_duration();

        Ok(entry)
    }

    /// Delete a draft time entry.
    #[instrument(skip(self), fields(time_entry_id = %time_entry_id))]
    pub async fn delete_time_entry(&self, time_entry_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM time_entries
            WHERE time_entry_id = $1 AND status = 'draft'
            "#,
        )
        .bind(time_entry_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to delete time entry: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Submit a draft time entry for approval.
    #[instrument(skip(self), fields(time_entry_id = %time_entry_id))]
    pub async fn submit_time_entry(
        &self,
        time_entry_id: Uuid,
    ) -> Result<Option<TimeEntry>, AppError> {
        let existing = self.get_time_entry(time_entry_id).await?;
        match existing {
            Some(ref entry) if entry.status == "draft" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only draft time entries can be submitted"
                )))
            }
            None => return Ok(None),
        };

        let entry = sqlx::query_as::<_, TimeEntry>(&format!(
            r#"
            UPDATE time_entries
            SET status = 'submitted', updated_utc = NOW()
            WHERE time_entry_id = $1 AND status = 'draft'
            RETURNING {TIME_ENTRY_COLUMNS}
            "#,
        ))
        .bind(time_entry_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to submit time entry: {}", e))
        })?;

        Ok(entry)
    }

    // -------------------------------------------------------------------------
    // Timesheet Operations
    // -------------------------------------------------------------------------

    /// Create a timesheet and attach the owner's unattached draft entries in
    /// the period, in one transaction.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn create_timesheet(&self, input: &CreateTimesheet) -> Result<Timesheet, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_timesheet"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let timesheet_id = Uuid::new_v4();
        let timesheet = sqlx::query_as::<_, Timesheet>(&format!(
            r#"
            INSERT INTO timesheets (timesheet_id, user_id, period_start, period_end)
            VALUES ($1, $2, $3, $4)
            RETURNING {TIMESHEET_COLUMNS}
            "#,
        ))
        .bind(timesheet_id)
        .bind(input.user_id)
        .bind(input.period_start)
        .bind(input.period_end)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create timesheet: {}", e))
        })?;

        let attached = sqlx::query(
            r#"
            UPDATE time_entries
            SET timesheet_id = $1, updated_utc = NOW()
            WHERE user_id = $2
              AND timesheet_id IS NULL
              AND status = 'draft'
              AND entry_date >= $3
              AND entry_date <= $4
            "#,
        )
        .bind(timesheet_id)
        .bind(input.user_id)
        .bind(input.period_start)
        .bind(input.period_end)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to attach time entries: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            timesheet_id = %timesheet.timesheet_id,
            attached_entries = attached.rows_affected(),
            "Timesheet created"
        );

        Ok(timesheet)
    }

    /// Get a timesheet by ID.
    #[instrument(skip(self), fields(timesheet_id = %timesheet_id))]
    pub async fn get_timesheet(&self, timesheet_id: Uuid) -> Result<Option<Timesheet>, AppError> {
        let timesheet = sqlx::query_as::<_, Timesheet>(&format!(
            r#"
            SELECT {TIMESHEET_COLUMNS}
            FROM timesheets
            WHERE timesheet_id = $1
            "#,
        ))
        .bind(timesheet_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get timesheet: {}", e)))?;

        Ok(timesheet)
    }

    /// List timesheets, optionally restricted to one user.
    #[instrument(skip(self))]
    pub async fn list_timesheets(
        &self,
        user_id: Option<Uuid>,
        status: Option<TimesheetStatus>,
    ) -> Result<Vec<Timesheet>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_timesheets"])
            .start_timer();

        let status_str = status.map(|s| s.as_str().to_string());
        let timesheets = sqlx::query_as::<_, Timesheet>(&format!(
            r#"
            SELECT {TIMESHEET_COLUMNS}
            FROM timesheets
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::varchar IS NULL OR status = $2)
            ORDER BY period_start DESC
            "#,
        ))
        .bind(user_id)
        .bind(&status_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list timesheets: {}", e))
        })?;

        timer.observe_duration();

        Ok(timesheets)
    }

    /// Get the time entries attached to a timesheet.
    #[instrument(skip(self), fields(timesheet_id = %timesheet_id))]
    pub async fn get_timesheet_entries(
        &self,
        timesheet_id: Uuid,
    ) -> Result<Vec<TimeEntry>, AppError> {
        let entries = sqlx::query_as::<_, TimeEntry>(&format!(
            r#"
            SELECT {TIME_ENTRY_COLUMNS}
            FROM time_entries
            WHERE timesheet_id = $1
            ORDER BY entry_date, time_entry_id
            "#,
        ))
        .bind(timesheet_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get timesheet entries: {}", e))
        })?;

        Ok(entries)
    }

    /// Submit a draft timesheet: the sheet and its draft entries move to
    /// submitted together.
    #[instrument(skip(self), fields(timesheet_id = %timesheet_id))]
    pub async fn submit_timesheet(
        &self,
        timesheet_id: Uuid,
    ) -> Result<Option<Timesheet>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["submit_timesheet"])
            .start_timer();

        let existing = self.get_timesheet(timesheet_id).await?;
        match existing {
            Some(ref sheet) if sheet.status == "draft" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only draft timesheets can be submitted"
                )))
            }
            None => return Ok(None),
        };

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let timesheet = sqlx::query_as::<_, Timesheet>(&format!(
            r#"
            UPDATE timesheets
            SET status = 'submitted', submitted_utc = NOW()
            WHERE timesheet_id = $1 AND status = 'draft'
            RETURNING {TIMESHEET_COLUMNS}
            "#,
        ))
        .bind(timesheet_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to submit timesheet: {}", e))
        })?
        // A concurrent transition can slip in between the status check and
        // this update; report it like any other wrong-status submit.
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Only draft timesheets can be submitted"))
        })?;

        sqlx::query(
            r#"
            UPDATE time_entries
            SET status = 'submitted', updated_utc = NOW()
            WHERE timesheet_id = $1 AND status = 'draft'
            "#,
        )
        .bind(timesheet_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to submit timesheet entries: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(timesheet_id = %timesheet_id, "Timesheet submitted");

        Ok(Some(timesheet))
    }

    /// Approve or reject a submitted timesheet. The decision cascades to the
    /// sheet's submitted entries in the same transaction; billed entries are
    /// never touched.
    #[instrument(skip(self), fields(timesheet_id = %timesheet_id, approve = approve))]
    pub async fn decide_timesheet(
        &self,
        timesheet_id: Uuid,
        decided_by: Uuid,
        approve: bool,
    ) -> Result<Option<Timesheet>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["decide_timesheet"])
            .start_timer();

        let existing = self.get_timesheet(timesheet_id).await?;
        match existing {
            Some(ref sheet) if sheet.status == "submitted" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only submitted timesheets can be approved or rejected"
                )))
            }
            None => return Ok(None),
        };

        let new_status = if approve {
            TimesheetStatus::Approved
        } else {
            TimesheetStatus::Rejected
        };

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let timesheet = sqlx::query_as::<_, Timesheet>(&format!(
            r#"
            UPDATE timesheets
            SET status = $2, decided_utc = NOW(), decided_by = $3
            WHERE timesheet_id = $1 AND status = 'submitted'
            RETURNING {TIMESHEET_COLUMNS}
            "#,
        ))
        .bind(timesheet_id)
        .bind(new_status.as_str())
        .bind(decided_by)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to decide timesheet: {}", e))
        })?
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Only submitted timesheets can be approved or rejected"
            ))
        })?;

        sqlx::query(
            r#"
            UPDATE time_entries
            SET status = $2, updated_utc = NOW()
            WHERE timesheet_id = $1 AND status = 'submitted'
            "#,
        )
        .bind(timesheet_id)
        .bind(if approve { "approved" } else { "rejected" })
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to cascade decision: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        TIMESHEET_DECISIONS_TOTAL
            .with_label_values(&[new_status.as_str()])
            .inc();

        info!(
            timesheet_id = %timesheet_id,
            decision = new_status.as_str(),
            "Timesheet decided"
        );

        Ok(Some(timesheet))
    }

    /// Delete a draft timesheet, detaching its entries.
    #[instrument(skip(self), fields(timesheet_id = %timesheet_id))]
    pub async fn delete_timesheet(&self, timesheet_id: Uuid) -> Result<bool, AppError> {
        let existing = self.get_timesheet(timesheet_id).await?;
        match existing {
            Some(ref sheet) if sheet.status == "draft" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only draft timesheets can be deleted"
                )))
            }
            None => return Ok(false),
        };

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query("UPDATE time_entries SET timesheet_id = NULL WHERE timesheet_id = $1")
            .bind(timesheet_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to detach entries: {}", e))
            })?;

        let result = sqlx::query(
            "DELETE FROM timesheets WHERE timesheet_id = $1 AND status = 'draft'",
        )
        .bind(timesheet_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to delete timesheet: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Generate a draft invoice from a client's approved, unbilled time
    /// entries in the period. One transaction: the billable entries are
    /// locked, priced at their project's hourly rate, written as items, and
    /// marked billed. Totals: subtotal = Σ line amounts, tax = subtotal ×
    /// client tax rate, total = subtotal + tax.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn generate_invoice(&self, input: &GenerateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["generate_invoice"])
            .start_timer();

        let client = self
            .get_client(input.client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        // Lock the candidate entries so a concurrent generation cannot pick
        // them up; the UNIQUE constraint on invoice_items.time_entry_id is
        // the backstop.
        let billable = sqlx::query_as::<_, BillableEntry>(
            r#"
            SELECT te.time_entry_id, te.entry_date, te.hours, te.description,
                   t.name AS task_name, p.hourly_rate
            FROM time_entries te
            JOIN tasks t ON t.task_id = te.task_id
            JOIN projects p ON p.project_id = t.project_id
            WHERE p.client_id = $1
              AND te.status = 'approved'
              AND te.entry_date >= $2
              AND te.entry_date <= $3
            ORDER BY te.entry_date, te.time_entry_id
            FOR UPDATE OF te
            "#,
        )
        .bind(input.client_id)
        .bind(input.period_start)
        .bind(input.period_end)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to select billable entries: {}", e))
        })?;

        if billable.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "No approved unbilled time entries for this client in the period"
            )));
        }

        let items: Vec<CreateInvoiceItem> =
            billable.into_iter().map(BillableEntry::into_item).collect();
        let totals = InvoiceTotals::compute(items.iter().map(|i| i.amount()), client.tax_rate);

        let invoice_id = Uuid::new_v4();
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (invoice_id, client_id, status, period_start, period_end,
                due_date, subtotal, tax_rate, tax_amount, total, notes)
            VALUES ($1, $2, 'draft', $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .bind(input.client_id)
        .bind(input.period_start)
        .bind(input.period_end)
        .bind(input.due_date)
        .bind(totals.subtotal)
        .bind(client.tax_rate)
        .bind(totals.tax_amount)
        .bind(totals.total)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e))
        })?;

        let entry_ids: Vec<Uuid> = items.iter().map(|i| i.time_entry_id).collect();
        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (invoice_item_id, invoice_id, time_entry_id,
                    description, hours, unit_price, amount)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice_id)
            .bind(item.time_entry_id)
            .bind(&item.description)
            .bind(item.hours)
            .bind(item.unit_price)
            .bind(item.amount())
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict(anyhow::anyhow!(
                        "Time entry {} is already invoiced",
                        item.time_entry_id
                    ))
                }
                _ => AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to create invoice item: {}",
                    e
                )),
            })?;
        }

        sqlx::query(
            r#"
            UPDATE time_entries
            SET status = 'billed', updated_utc = NOW()
            WHERE time_entry_id = ANY($1)
            "#,
        )
        .bind(&entry_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark entries billed: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        INVOICES_TOTAL.with_label_values(&["draft"]).inc();

        info!(
            invoice_id = %invoice.invoice_id,
            items = entry_ids.len(),
            total = %invoice.total,
            "Draft invoice generated"
        );

        Ok(invoice)
    }

    /// Get an invoice by ID.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE invoice_id = $1
            "#,
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// Get the items of an invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice_items(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceItem>, AppError> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT invoice_item_id, invoice_id, time_entry_id, description, hours, unit_price,
                amount, created_utc
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY created_utc, invoice_item_id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice items: {}", e))
        })?;

        Ok(items)
    }

    /// List invoices matching a filter.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;
        let status_str = filter.status.map(|s| s.as_str().to_string());

        let invoices = if let Some(cursor) = filter.page_token {
            sqlx::query_as::<_, Invoice>(&format!(
                r#"
                SELECT {INVOICE_COLUMNS}
                FROM invoices
                WHERE ($1::varchar IS NULL OR status = $1)
                  AND ($2::uuid IS NULL OR client_id = $2)
                  AND ($3::date IS NULL OR period_start >= $3)
                  AND ($4::date IS NULL OR period_end <= $4)
                  AND invoice_id > $5
                ORDER BY invoice_id
                LIMIT $6
                "#,
            ))
            .bind(&status_str)
            .bind(filter.client_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(cursor)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Invoice>(&format!(
                r#"
                SELECT {INVOICE_COLUMNS}
                FROM invoices
                WHERE ($1::varchar IS NULL OR status = $1)
                  AND ($2::uuid IS NULL OR client_id = $2)
                  AND ($3::date IS NULL OR period_start >= $3)
                  AND ($4::date IS NULL OR period_end <= $4)
                ORDER BY invoice_id
                LIMIT $5
                "#,
            ))
            .bind(&status_str)
            .bind(filter.client_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Send a draft invoice: assign the next sequential invoice number and
    /// the issue date, and move it to sent.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn send_invoice(
        &self,
        invoice_id: Uuid,
        issue_date: NaiveDate,
        default_due_date: NaiveDate,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["send_invoice"])
            .start_timer();

        let existing = self.get_invoice(invoice_id).await?;
        match existing {
            Some(ref inv) if inv.status == "draft" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only draft invoices can be sent"
                )))
            }
            None => return Ok(None),
        };

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET invoice_number = next_invoice_number(),
                status = 'sent',
                issue_date = $2,
                due_date = COALESCE(due_date, $3),
                sent_utc = NOW()
            WHERE invoice_id = $1 AND status = 'draft'
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .bind(issue_date)
        .bind(default_due_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to send invoice: {}", e)))?;

        timer.observe_duration();

        if let Some(ref inv) = invoice {
            INVOICES_TOTAL.with_label_values(&["sent"]).inc();
            if let Some(total) = inv.total.to_f64() {
                INVOICE_AMOUNT_TOTAL
                    .with_label_values(&["sent"])
                    .inc_by(total);
            }
            info!(
                invoice_id = %inv.invoice_id,
                invoice_number = %inv.invoice_number.as_deref().unwrap_or(""),
                "Invoice sent"
            );
        }

        Ok(invoice)
    }

    /// Mark a sent or overdue invoice paid.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn mark_invoice_paid(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let existing = self.get_invoice(invoice_id).await?;
        match existing {
            Some(ref inv) if inv.status == "sent" || inv.status == "overdue" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only sent or overdue invoices can be marked paid"
                )))
            }
            None => return Ok(None),
        };

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = 'paid', paid_utc = NOW()
            WHERE invoice_id = $1 AND status IN ('sent', 'overdue')
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark invoice paid: {}", e))
        })?;

        if let Some(ref inv) = invoice {
            INVOICES_TOTAL.with_label_values(&["paid"]).inc();
            info!(invoice_id = %inv.invoice_id, "Invoice paid");
        }

        Ok(invoice)
    }

    /// Cancel a draft or sent invoice, releasing its time entries back to
    /// approved and removing its items so the entries can be rebilled. One
    /// transaction.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn cancel_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["cancel_invoice"])
            .start_timer();

        let existing = self.get_invoice(invoice_id).await?;
        match existing {
            Some(ref inv) if inv.status == "draft" || inv.status == "sent" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only draft or sent invoices can be cancelled"
                )))
            }
            None => return Ok(None),
        };

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query(
            r#"
            UPDATE time_entries
            SET status = 'approved', updated_utc = NOW()
            WHERE time_entry_id IN (
                SELECT time_entry_id FROM invoice_items WHERE invoice_id = $1
            )
            "#,
        )
        .bind(invoice_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to release time entries: {}", e))
        })?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice items: {}", e))
            })?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = 'cancelled', cancelled_utc = NOW()
            WHERE invoice_id = $1 AND status IN ('draft', 'sent')
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to cancel invoice: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        INVOICES_TOTAL.with_label_values(&["cancelled"]).inc();

        info!(invoice_id = %invoice_id, "Invoice cancelled");

        Ok(Some(invoice))
    }

    /// Delete a draft invoice, releasing its time entries.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> Result<bool, AppError> {
        let existing = self.get_invoice(invoice_id).await?;
        match existing {
            Some(ref inv) if inv.status == "draft" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only draft invoices can be deleted"
                )))
            }
            None => return Ok(false),
        };

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query(
            r#"
            UPDATE time_entries
            SET status = 'approved', updated_utc = NOW()
            WHERE time_entry_id IN (
                SELECT time_entry_id FROM invoice_items WHERE invoice_id = $1
            )
            "#,
        )
        .bind(invoice_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to release time entries: {}", e))
        })?;

        let result = sqlx::query(
            "DELETE FROM invoices WHERE invoice_id = $1 AND status = 'draft'",
        )
        .bind(invoice_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Move sent invoices past their due date to overdue. Returns the number
    /// of invoices swept.
    #[instrument(skip(self))]
    pub async fn mark_overdue_invoices(&self) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_overdue_invoices"])
            .start_timer();

        let today = Utc::now().date_naive();
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = 'overdue'
            WHERE status = 'sent' AND due_date IS NOT NULL AND due_date < $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to sweep overdue invoices: {}", e))
        })?;

        timer.observe_duration();

        let swept = result.rows_affected();
        if swept > 0 {
            INVOICES_TOTAL
                .with_label_values(&["overdue"])
                .inc_by(swept as f64);
            info!(count = swept, "Invoices marked overdue");
        }

        Ok(swept)
    }

}
