//! Accounts: identifiers, persistence and lifecycle
//!
//! Two store backends share one contract: PostgreSQL for deployment and an
//! in-memory map with per-row async locks for tests and local runs.

pub mod iban;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod service;
pub mod store;

pub use iban::{Iban, IbanError, IbanGenerator};
pub use memory::MemoryAccountStore;
pub use models::{Account, NewAccount};
pub use postgres::PgAccountStore;
pub use service::{AccountError, AccountService, CreateAccountRequest};
pub use store::{AccountStore, StoreError, UnitOfWork};
