//! Database connection management

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::StoreConfig;

const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id            BIGSERIAL PRIMARY KEY,
    iban          VARCHAR(34)  NOT NULL UNIQUE,
    first_name    VARCHAR(70)  NOT NULL,
    last_name     VARCHAR(70)  NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    balance       BIGINT       NOT NULL DEFAULT 0 CHECK (balance >= 0),
    created_at    TIMESTAMPTZ  NOT NULL DEFAULT NOW()
)"#;

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(config: &StoreConfig) -> Result<Self, sqlx::Error> {
        let url = config
            .postgres_url
            .as_deref()
            .ok_or_else(|| sqlx::Error::Configuration("store.postgres_url is not set".into()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "PostgreSQL connection pool established"
        );
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `accounts` table if it does not exist
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_ACCOUNTS_TABLE)
            .execute(&self.pool)
            .await?;
        tracing::info!("Schema ready (accounts)");
        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
