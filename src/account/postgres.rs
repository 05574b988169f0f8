//! PostgreSQL account store
//!
//! Row locks are PostgreSQL's own (`SELECT ... FOR UPDATE`); each unit of work
//! is one `sqlx::Transaction` with `lock_timeout` set for its duration so a
//! blocked lock wait fails with SQLSTATE 55P03 instead of hanging.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::debug;

use super::iban::Iban;
use super::models::{Account, NewAccount};
use super::store::{AccountStore, StoreError, UnitOfWork};
use crate::db::Database;

const ACCOUNT_COLUMNS: &str =
    "id, iban, first_name, last_name, password_hash, balance, created_at";

/// Account store backed by the `accounts` table
pub struct PgAccountStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgAccountStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn from_database(db: &Database, lock_timeout: Duration) -> Self {
        Self::new(db.pool().clone(), lock_timeout)
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            r#"INSERT INTO accounts (iban, first_name, last_name, password_hash, balance, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {ACCOUNT_COLUMNS}"#
        );
        let row: Account = sqlx::query_as(&query)
            .bind(&account.iban)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.password_hash)
            .bind(account.balance)
            .bind(account.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row: Option<Account> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_by_iban(&self, iban: &Iban) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE iban = $1");
        let row: Option<Account> = sqlx::query_as(&query)
            .bind(iban)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        // Bounded like any other lock wait: DELETE queues behind transfers
        let mut tx = self.pool.begin().await?;
        set_lock_timeout(&mut tx, self.lock_timeout).await?;
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let mut tx = self.pool.begin().await?;
        set_lock_timeout(&mut tx, self.lock_timeout).await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// `SET LOCAL` takes no bind parameters; the value is an integer we format.
async fn set_lock_timeout(
    tx: &mut Transaction<'static, Postgres>,
    timeout: Duration,
) -> Result<(), StoreError> {
    let stmt = format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis().max(1));
    sqlx::query(&stmt).execute(&mut **tx).await?;
    Ok(())
}

/// One PostgreSQL transaction. sqlx rolls back on drop if not committed.
struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_for_update(&mut self, iban: &Iban) -> Result<Option<i64>, StoreError> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE iban = $1 FOR UPDATE")
                .bind(iban)
                .fetch_optional(&mut *self.tx)
                .await?;
        debug!(iban = %iban, found = balance.is_some(), "Row locked");
        Ok(balance)
    }

    async fn set_balance(&mut self, iban: &Iban, balance: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE accounts SET balance = $2 WHERE iban = $1")
            .bind(iban)
            .bind(balance)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() != 1 {
            return Err(StoreError::Database(format!(
                "balance update for {} touched {} rows",
                iban,
                result.rows_affected()
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
