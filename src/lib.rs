//! Bank ledger: accounts and atomic funds transfers over HTTP
//!
//! # Modules
//!
//! - [`account`] - IBANs, account records, store backends, account service
//! - [`ledger`] - Transfer engine (row-locked, all-or-nothing)
//! - [`auth`] - Password hashing and bearer tokens
//! - [`gateway`] - axum router, handlers, OpenAPI
//! - [`money`] - Decimal strings to minor units and back
//! - [`config`] / [`logging`] / [`db`] - Process plumbing

pub mod account;
pub mod auth;
pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod money;

// Convenient re-exports at crate root
pub use account::{Account, AccountService, AccountStore, Iban};
pub use ledger::{TransferEngine, TransferError, TransferIntent, TransferReceipt};
