//! Account persistence contract
//!
//! `AccountStore` covers single-row CRUD. Balance mutation only happens
//! through a [`UnitOfWork`]: lock the rows, read, write, commit. Dropping a
//! unit of work without committing rolls it back, which is what makes request
//! cancellation safe.

use async_trait::async_trait;
use thiserror::Error;

use super::iban::Iban;
use super::models::{Account, NewAccount};

/// Storage-level failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// A row-lock wait exceeded the configured bound. Retryable.
    #[error("Timed out waiting for a row lock")]
    LockTimeout,

    /// Unique constraint violated (e.g. IBAN already taken)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store unreachable (pool exhausted, connection lost). Retryable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::LockTimeout => "LOCK_TIMEOUT",
            StoreError::Conflict(_) => "CONFLICT",
            StoreError::Unavailable(_) => "STORE_UNAVAILABLE",
            StoreError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::LockTimeout | StoreError::Unavailable(_))
    }
}

// SQLSTATE codes we care about
const LOCK_NOT_AVAILABLE: &str = "55P03";
const DEADLOCK_DETECTED: &str = "40P01";
const QUERY_CANCELED: &str = "57014";
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(LOCK_NOT_AVAILABLE | DEADLOCK_DETECTED | QUERY_CANCELED) => {
                    StoreError::LockTimeout
                }
                Some(UNIQUE_VIOLATION) => StoreError::Conflict(db_err.message().to_string()),
                _ => StoreError::Database(e.to_string()),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// Account repository
#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Insert a new account; `Conflict` if the IBAN is taken.
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn get_by_iban(&self, iban: &Iban) -> Result<Option<Account>, StoreError>;

    /// Delete by id. Waits for any unit of work holding the row lock.
    /// Returns false when no such account exists.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Open a unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// One atomic, all-or-nothing group of reads and writes.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Take the exclusive row lock for `iban` and return its balance.
    ///
    /// Blocks while another unit of work holds the lock. `None` if the
    /// account does not exist (or was deleted while we waited).
    async fn lock_for_update(&mut self, iban: &Iban) -> Result<Option<i64>, StoreError>;

    /// Stage a balance write for a row this unit of work has locked.
    async fn set_balance(&mut self, iban: &Iban, balance: i64) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
