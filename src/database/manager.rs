use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the relational store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique index rejected the write; carries the constraint name.
    #[error("Duplicate value for {0}")]
    Duplicate(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return DatabaseError::Duplicate(db.constraint().unwrap_or("unique index").to_string());
            }
        }
        DatabaseError::Sqlx(err)
    }
}

/// Connection pool setup and schema migration for the managed PostgreSQL store
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open the shared pool described by `config`
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Created database pool (max {} connections)",
            config.max_connections
        );
        Ok(pool)
    }

    /// Apply the bundled migrations in `migrations/`
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
