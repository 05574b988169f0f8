//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `error_codes`: Standard error code constants
//! - Response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::account::Account;
use crate::ledger::TransferReceipt;
use crate::money::format_minor_units;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All successful responses follow this structure:
/// - code: always 0
/// - msg: "ok"
/// - data: the payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "NL26LEDG0123456789")]
    pub iban: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// Transfer request. The source is always the authenticated caller.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[schema(example = "NL42LEDG0000000042")]
    pub to_account_iban: String,
    /// Decimal string with at most two fractional digits
    #[schema(example = "30.00")]
    #[serde(deserialize_with = "decimal_string")]
    pub amount: String,
}

/// Amounts travel as strings; a JSON number is refused with a hint.
fn decimal_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct DecimalString;

    impl serde::de::Visitor<'_> for DecimalString {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a decimal string such as \"30.00\"")
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_owned())
        }
    }

    deserializer.deserialize_str(DecimalString)
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "NL26LEDG0123456789")]
    pub iban: String,
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace")]
    pub last_name: String,
    #[schema(example = "100.00")]
    pub balance: String,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            iban: account.iban.into(),
            first_name: account.first_name,
            last_name: account.last_name,
            balance: format_minor_units(account.balance),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    #[schema(example = 1)]
    pub deleted: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub iban: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub reference: Uuid,
    #[schema(example = "NL26LEDG0123456789")]
    pub from_account_iban: String,
    #[schema(example = "NL42LEDG0000000042")]
    pub to_account_iban: String,
    #[schema(example = "30.00")]
    pub amount: String,
    /// Caller's balance after the transfer
    #[schema(example = "70.00")]
    pub balance: String,
}

impl From<TransferReceipt> for TransferResponse {
    fn from(receipt: TransferReceipt) -> Self {
        Self {
            reference: receipt.reference,
            from_account_iban: receipt.source.into(),
            to_account_iban: receipt.destination.into(),
            amount: format_minor_units(receipt.amount),
            balance: format_minor_units(receipt.source_balance),
        }
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_FUNDS: i32 = 1002;
    pub const INVALID_AMOUNT: i32 = 1003;
    pub const INVALID_TRANSFER: i32 = 1004;
    pub const BALANCE_OVERFLOW: i32 = 1005;

    // Auth errors (2xxx)
    pub const UNAUTHORIZED: i32 = 2001;
    pub const FORBIDDEN: i32 = 2003;

    // Resource errors (4xxx)
    pub const ACCOUNT_NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4090;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORE_UNAVAILABLE: i32 = 5001;
    pub const LOCK_TIMEOUT: i32 = 5002;
}
