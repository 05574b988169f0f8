//! Account lifecycle: creation, lookup, deletion, credential check.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::Validate;

use super::iban::{Iban, IbanError, IbanGenerator};
use super::models::{Account, NewAccount};
use super::store::{AccountStore, StoreError};
use crate::auth::AuthError;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::config::AccountsConfig;
use crate::money::{self, MoneyError};

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Account with id {0} not found")]
    NotFound(i64),

    #[error("Invalid IBAN or password")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Could not allocate a unique IBAN after {0} attempts")]
    IbanSpaceExhausted(u32),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccountError {
    pub fn code(&self) -> &'static str {
        match self {
            AccountError::NotFound(_) => "ACCOUNT_NOT_FOUND",
            AccountError::InvalidCredentials => "UNAUTHORIZED",
            AccountError::InvalidInput(_) => "INVALID_PARAMETER",
            AccountError::IbanSpaceExhausted(_) => "CONFLICT",
            AccountError::Auth(e) => e.code(),
            AccountError::Store(e) => e.code(),
        }
    }
}

impl From<MoneyError> for AccountError {
    fn from(e: MoneyError) -> Self {
        AccountError::InvalidInput(format!("openingBalance: {}", e))
    }
}

impl From<IbanError> for AccountError {
    fn from(e: IbanError) -> Self {
        AccountError::InvalidInput(e.to_string())
    }
}

/// Account creation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 70))]
    #[schema(example = "Ada")]
    pub first_name: String,
    #[validate(length(min = 1, max = 70))]
    #[schema(example = "Lovelace")]
    pub last_name: String,
    #[validate(length(min = 8, max = 128))]
    #[schema(example = "password123")]
    pub password: String,
    /// Decimal string; defaults to the configured opening balance
    #[schema(example = "100.00")]
    pub opening_balance: Option<String>,
}

pub struct AccountService {
    store: Arc<dyn AccountStore>,
    iban_generator: IbanGenerator,
    default_opening_balance: i64,
    iban_attempts: u32,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, config: &AccountsConfig) -> Result<Self, AccountError> {
        let iban_generator = IbanGenerator::new(&config.country_code, &config.bank_code)?;
        let default_opening_balance = money::parse_minor_units(&config.opening_balance)?;
        Ok(Self {
            store,
            iban_generator,
            default_opening_balance,
            iban_attempts: config.iban_attempts.max(1),
        })
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    pub async fn create(&self, req: CreateAccountRequest) -> Result<Account, AccountError> {
        req.validate()
            .map_err(|e| AccountError::InvalidInput(e.to_string()))?;

        let balance = match req.opening_balance.as_deref() {
            Some(s) => money::parse_minor_units(s)?,
            None => self.default_opening_balance,
        };
        let password_hash = hash_password_blocking(req.password).await?;
        let created_at = Utc::now();

        for attempt in 1..=self.iban_attempts {
            let iban = self.iban_generator.generate(&mut rand::thread_rng());
            let new = NewAccount {
                iban: iban.clone(),
                first_name: req.first_name.clone(),
                last_name: req.last_name.clone(),
                password_hash: password_hash.clone(),
                balance,
                created_at,
            };

            match self.store.insert(new).await {
                Ok(account) => {
                    info!(account_id = account.id, iban = %account.iban, "Account created");
                    return Ok(account);
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(iban = %iban, attempt, "IBAN collision, drawing another");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AccountError::IbanSpaceExhausted(self.iban_attempts))
    }

    pub async fn get(&self, id: i64) -> Result<Account, AccountError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or(AccountError::NotFound(id))
    }

    pub async fn delete(&self, id: i64) -> Result<(), AccountError> {
        if self.store.delete(id).await? {
            info!(account_id = id, "Account deleted");
            Ok(())
        } else {
            Err(AccountError::NotFound(id))
        }
    }

    /// Unknown IBAN and wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, iban: &Iban, password: &str) -> Result<Account, AccountError> {
        let Some(account) = self.store.get_by_iban(iban).await? else {
            return Err(AccountError::InvalidCredentials);
        };
        if !verify_password_blocking(password.to_string(), account.password_hash.clone()).await {
            return Err(AccountError::InvalidCredentials);
        }
        Ok(account)
    }
}
