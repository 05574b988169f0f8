use std::sync::Arc;

use crate::account::{AccountError, AccountService, AccountStore};
use crate::auth::AuthGate;
use crate::config::AppConfig;
use crate::ledger::TransferEngine;

/// Shared gateway state
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub accounts: AccountService,
    pub engine: TransferEngine,
    pub auth: AuthGate,
}

impl AppState {
    /// Wire services over `store`. Configuration is read here once.
    pub fn new(store: Arc<dyn AccountStore>, config: &AppConfig) -> Result<Self, AccountError> {
        Ok(Self {
            accounts: AccountService::new(Arc::clone(&store), &config.accounts)?,
            engine: TransferEngine::new(Arc::clone(&store), config.transfer.timeout()),
            auth: AuthGate::new(&config.auth),
            store,
        })
    }
}
