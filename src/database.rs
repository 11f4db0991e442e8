//! SQLite-backed user directory.
//!
//! The `UNIQUE` constraint on `users.email` is the authoritative duplicate check;
//! the pre-check in [`crate::AuthService::signup`] only saves a hash on the common path.

use crate::config::IdentityConfig;
use crate::directory::UserDirectory;
use crate::error::AuthError;
use crate::models::{Identity, IdentityUpdate};
use crate::password::PasswordRecord;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;

/// Raw `users` row
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password: String,
}

impl TryFrom<UserRow> for Identity {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let credential = row.password.parse::<PasswordRecord>().map_err(|e| {
            tracing::error!(user_id = row.id, "Stored credential is malformed: {}", e);
            AuthError::Internal
        })?;

        Ok(Identity {
            id: row.id,
            email: row.email,
            credential,
        })
    }
}

/// Open a connection pool, creating the database file if needed
pub async fn connect(config: &IdentityConfig) -> Result<SqlitePool, AuthError> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create the identity schema
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AuthError> {
    tracing::info!("Running identity database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Identity migrations completed successfully");
    Ok(())
}

/// Directory backed by the `users` table
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl UserDirectory for SqliteDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Vec<Identity>, AuthError> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, email, password FROM users WHERE email = ?1 ORDER BY id")
                .bind(email)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Identity::try_from).collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, AuthError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, password FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Identity::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Identity>, AuthError> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT id, email, password FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Identity::try_from).collect()
    }

    async fn create(&self, email: &str, credential: PasswordRecord) -> Result<Identity, AuthError> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (email, password) VALUES (?1, ?2) RETURNING id, email, password",
        )
        .bind(email)
        .bind(credential.to_string())
        .fetch_one(&self.pool)
        .await?;

        Identity::try_from(row)
    }

    async fn update(&self, id: i64, changes: IdentityUpdate) -> Result<Identity, AuthError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            UPDATE users SET
                email = COALESCE(?1, email),
                password = COALESCE(?2, password)
            WHERE id = ?3
            RETURNING id, email, password
            "#,
        )
        .bind(changes.email)
        .bind(changes.credential.map(String::from))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(AuthError::UserNotFound(id))?.try_into()
    }

    async fn remove(&self, id: i64) -> Result<Identity, AuthError> {
        let row: Option<UserRow> =
            sqlx::query_as("DELETE FROM users WHERE id = ?1 RETURNING id, email, password")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or(AuthError::UserNotFound(id))?.try_into()
    }
}
