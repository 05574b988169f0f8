//! In-process account store
//!
//! Mirrors the PostgreSQL locking contract without a database: one async
//! mutex per row plays the part of `SELECT ... FOR UPDATE`, writes are staged
//! in the unit of work and published on commit, and plain reads see the last
//! committed snapshot without waiting for locks. Used for `store.backend:
//! memory` and throughout the test-suite.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use super::iban::Iban;
use super::models::{Account, NewAccount};
use super::store::{AccountStore, StoreError, UnitOfWork};

struct Inner {
    /// Committed state
    accounts: DashMap<Iban, Account>,
    ids: DashMap<i64, Iban>,
    row_locks: DashMap<Iban, Arc<Mutex<()>>>,
    /// Readers hold it shared; commit holds it exclusively while publishing
    /// so a single commit is never observed half-applied.
    publish: RwLock<()>,
    next_id: AtomicI64,
    lock_timeout: Duration,
}

impl Inner {
    fn row_lock(&self, iban: &Iban) -> Option<Arc<Mutex<()>>> {
        self.row_locks.get(iban).map(|l| Arc::clone(l.value()))
    }

    /// False once the row behind `lock` was deleted, even if an account with
    /// the same IBAN has been inserted since.
    fn is_current_lock(&self, iban: &Iban, lock: &Arc<Mutex<()>>) -> bool {
        self.row_locks
            .get(iban)
            .is_some_and(|current| Arc::ptr_eq(current.value(), lock))
    }

    async fn acquire(&self, lock: Arc<Mutex<()>>) -> Result<OwnedMutexGuard<()>, StoreError> {
        tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout)
    }
}

/// Account store held entirely in memory
#[derive(Clone)]
pub struct MemoryAccountStore {
    inner: Arc<Inner>,
}

impl MemoryAccountStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                accounts: DashMap::new(),
                ids: DashMap::new(),
                row_locks: DashMap::new(),
                publish: RwLock::new(()),
                next_id: AtomicI64::new(1),
                lock_timeout,
            }),
        }
    }

    /// Convenience for tests and local seeding.
    pub async fn seed(&self, iban: Iban, balance: i64) -> Result<Account, StoreError> {
        self.insert(NewAccount {
            iban,
            first_name: "Seed".to_string(),
            last_name: "Account".to_string(),
            password_hash: String::new(),
            balance,
            created_at: Utc::now(),
        })
        .await
    }

    pub fn len(&self) -> usize {
        self.inner.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        if account.balance < 0 {
            return Err(StoreError::Database("balance must not be negative".into()));
        }
        let _publish = self.inner.publish.read().await;

        match self.inner.accounts.entry(account.iban.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "iban {} already exists",
                account.iban
            ))),
            Entry::Vacant(slot) => {
                let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
                let account = account.into_account(id);
                self.inner
                    .row_locks
                    .insert(account.iban.clone(), Arc::new(Mutex::new(())));
                self.inner.ids.insert(id, account.iban.clone());
                slot.insert(account.clone());
                Ok(account)
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let _publish = self.inner.publish.read().await;
        let Some(iban) = self.inner.ids.get(&id).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        Ok(self.inner.accounts.get(&iban).map(|r| r.value().clone()))
    }

    async fn get_by_iban(&self, iban: &Iban) -> Result<Option<Account>, StoreError> {
        let _publish = self.inner.publish.read().await;
        Ok(self.inner.accounts.get(iban).map(|r| r.value().clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let Some(iban) = self.inner.ids.get(&id).map(|r| r.value().clone()) else {
            return Ok(false);
        };
        let Some(lock) = self.inner.row_lock(&iban) else {
            return Ok(false);
        };

        // Same as DELETE in Postgres: wait for whoever holds the row
        let _guard = self.inner.acquire(lock).await?;
        let _publish = self.inner.publish.write().await;

        if self.inner.accounts.remove(&iban).is_none() {
            return Ok(false);
        }
        self.inner.ids.remove(&id);
        self.inner.row_locks.remove(&iban);
        debug!(account_id = id, iban = %iban, "Account removed from memory store");
        Ok(true)
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(MemoryUnitOfWork {
            inner: Arc::clone(&self.inner),
            held: HashMap::new(),
            staged: HashMap::new(),
        }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Unit of work over [`MemoryAccountStore`]. Dropping it releases every row
/// lock and discards staged writes.
struct MemoryUnitOfWork {
    inner: Arc<Inner>,
    held: HashMap<Iban, OwnedMutexGuard<()>>,
    staged: HashMap<Iban, i64>,
}

impl MemoryUnitOfWork {
    fn current_balance(&self, iban: &Iban) -> Option<i64> {
        self.staged
            .get(iban)
            .copied()
            .or_else(|| self.inner.accounts.get(iban).map(|a| a.balance))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_for_update(&mut self, iban: &Iban) -> Result<Option<i64>, StoreError> {
        if self.held.contains_key(iban) {
            return Ok(self.current_balance(iban));
        }

        let Some(lock) = self.inner.row_lock(iban) else {
            return Ok(None);
        };
        let guard = self.inner.acquire(Arc::clone(&lock)).await?;

        // The row may have been deleted (and its IBAN reused) while we were
        // queued on its lock
        if !self.inner.is_current_lock(iban, &lock) {
            return Ok(None);
        }
        let Some(balance) = self.inner.accounts.get(iban).map(|a| a.balance) else {
            return Ok(None);
        };

        self.held.insert(iban.clone(), guard);
        Ok(Some(balance))
    }

    async fn set_balance(&mut self, iban: &Iban, balance: i64) -> Result<(), StoreError> {
        if !self.held.contains_key(iban) {
            return Err(StoreError::Database(format!(
                "row {} is not locked by this unit of work",
                iban
            )));
        }
        if balance < 0 {
            return Err(StoreError::Database(format!(
                "balance for {} would become negative",
                iban
            )));
        }
        self.staged.insert(iban.clone(), balance);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        {
            let _publish = this.inner.publish.write().await;
            for (iban, balance) in &this.staged {
                if let Some(mut account) = this.inner.accounts.get_mut(iban) {
                    account.balance = *balance;
                }
            }
        }
        // Row locks are released only after the new balances are visible
        drop(this.held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        drop(self);
        Ok(())
    }
}
