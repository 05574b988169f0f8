//! Data models for ledger accounts

use chrono::{DateTime, Utc};

use super::iban::Iban;

/// Account row as persisted by an [`AccountStore`](super::store::AccountStore).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub iban: Iban,
    pub first_name: String,
    pub last_name: String,
    /// argon2 PHC string (algorithm, params, salt and digest)
    pub password_hash: String,
    /// Minor units, never negative
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Insert payload; the store assigns `id`.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub iban: Iban,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl NewAccount {
    pub fn into_account(self, id: i64) -> Account {
        Account {
            id,
            iban: self.iban,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            balance: self.balance,
            created_at: self.created_at,
        }
    }
}
