//! Transfer error types

use thiserror::Error;

use crate::account::{Iban, StoreError};

#[derive(Error, Debug)]
pub enum TransferError {
    // === Validation Errors ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Source and destination account cannot be the same")]
    InvalidTransfer,

    // === Account Errors ===
    #[error("Account not found: {iban}")]
    AccountNotFound { iban: Iban },

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Destination balance would overflow")]
    BalanceOverflow,

    // === System Errors ===
    #[error("Timed out waiting for account locks")]
    LockTimeout,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::InvalidTransfer => "INVALID_TRANSFER",
            TransferError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            TransferError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            TransferError::BalanceOverflow => "BALANCE_OVERFLOW",
            TransferError::LockTimeout => "LOCK_TIMEOUT",
            TransferError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            TransferError::Store(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount | TransferError::InvalidTransfer => 400,
            TransferError::AccountNotFound { .. } => 404,
            TransferError::InsufficientFunds | TransferError::BalanceOverflow => 422,
            TransferError::LockTimeout | TransferError::StoreUnavailable(_) => 503,
            TransferError::Store(_) => 500,
        }
    }

    /// The caller may resubmit the same transfer unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransferError::LockTimeout | TransferError::StoreUnavailable(_)
        )
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::LockTimeout => TransferError::LockTimeout,
            StoreError::Unavailable(msg) => TransferError::StoreUnavailable(msg),
            StoreError::Conflict(msg) | StoreError::Database(msg) => TransferError::Store(msg),
        }
    }
}
