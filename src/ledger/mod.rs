//! Funds transfer between accounts

pub mod engine;
pub mod error;

pub use engine::{TransferEngine, TransferIntent, TransferReceipt};
pub use error::TransferError;
