//! Transfer engine
//!
//! A transfer is one unit of work: lock both rows, check, write both
//! balances, commit. Rows are always locked in IBAN order regardless of
//! direction, so two transfers touching the same pair can never wait on each
//! other in a cycle.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::TransferError;
use crate::account::{AccountStore, Iban, UnitOfWork};

/// Movement of `amount` minor units from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    /// Always the authenticated caller
    pub source: Iban,
    pub destination: Iban,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub reference: Uuid,
    pub source: Iban,
    pub destination: Iban,
    pub amount: i64,
    /// Caller's balance after commit
    pub source_balance: i64,
}

pub struct TransferEngine {
    store: Arc<dyn AccountStore>,
    timeout: Duration,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn AccountStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Execute a transfer atomically.
    ///
    /// Nothing is written unless every check passes. If `timeout` elapses the
    /// in-flight unit of work is dropped, which rolls it back. No retry is
    /// attempted here; `LockTimeout` is returned to the caller as retryable.
    pub async fn transfer(&self, intent: TransferIntent) -> Result<TransferReceipt, TransferError> {
        if intent.amount <= 0 {
            return Err(TransferError::InvalidAmount);
        }
        if intent.source == intent.destination {
            return Err(TransferError::InvalidTransfer);
        }

        let reference = Uuid::new_v4();
        debug!(
            reference = %reference,
            source = %intent.source,
            destination = %intent.destination,
            amount = intent.amount,
            "Transfer started"
        );

        let outcome = tokio::time::timeout(self.timeout, self.execute(&intent)).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(reference = %reference, timeout_ms = self.timeout.as_millis() as u64, "Transfer timed out");
                Err(TransferError::LockTimeout)
            }
        };

        match result {
            Ok(source_balance) => {
                info!(
                    reference = %reference,
                    source = %intent.source,
                    destination = %intent.destination,
                    amount = intent.amount,
                    "Transfer committed"
                );
                Ok(TransferReceipt {
                    reference,
                    source: intent.source,
                    destination: intent.destination,
                    amount: intent.amount,
                    source_balance,
                })
            }
            Err(e) => {
                info!(reference = %reference, error = %e, code = e.code(), "Transfer rejected");
                Err(e)
            }
        }
    }

    /// Returns the source balance after commit.
    async fn execute(&self, intent: &TransferIntent) -> Result<i64, TransferError> {
        let mut uow = self.store.begin().await?;

        let (first, second) = if intent.source < intent.destination {
            (&intent.source, &intent.destination)
        } else {
            (&intent.destination, &intent.source)
        };

        let first_balance = match uow.lock_for_update(first).await? {
            Some(balance) => balance,
            None => {
                return abort(uow, TransferError::AccountNotFound { iban: first.clone() }).await;
            }
        };
        let second_balance = match uow.lock_for_update(second).await? {
            Some(balance) => balance,
            None => {
                return abort(uow, TransferError::AccountNotFound { iban: second.clone() }).await;
            }
        };

        let (source_balance, destination_balance) = if first == &intent.source {
            (first_balance, second_balance)
        } else {
            (second_balance, first_balance)
        };

        if source_balance < intent.amount {
            return abort(uow, TransferError::InsufficientFunds).await;
        }
        let Some(new_destination) = destination_balance.checked_add(intent.amount) else {
            return abort(uow, TransferError::BalanceOverflow).await;
        };
        let new_source = source_balance - intent.amount;

        uow.set_balance(&intent.source, new_source).await?;
        uow.set_balance(&intent.destination, new_destination).await?;
        uow.commit().await?;

        Ok(new_source)
    }
}

/// Roll back and surface the business error; a rollback failure only gets
/// logged since the connection discards the transaction anyway.
async fn abort<T>(uow: Box<dyn UnitOfWork>, err: TransferError) -> Result<T, TransferError> {
    if let Err(e) = uow.rollback().await {
        warn!(error = %e, "Rollback failed");
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{IbanGenerator, MemoryAccountStore};
    use futures::future::join_all;

    fn ibans(n: u64) -> Vec<Iban> {
        let generator = IbanGenerator::new("NL", "LEDG").unwrap();
        (1..=n).map(|i| generator.for_account_number(i)).collect()
    }

    async fn setup(balances: &[i64]) -> (MemoryAccountStore, Arc<TransferEngine>, Vec<Iban>) {
        let store = MemoryAccountStore::new(Duration::from_secs(5));
        let ibans = ibans(balances.len() as u64);
        for (iban, balance) in ibans.iter().zip(balances) {
            store.seed(iban.clone(), *balance).await.unwrap();
        }
        let engine = Arc::new(TransferEngine::new(
            Arc::new(store.clone()),
            Duration::from_secs(10),
        ));
        (store, engine, ibans)
    }

    async fn balance(store: &MemoryAccountStore, iban: &Iban) -> i64 {
        store.get_by_iban(iban).await.unwrap().unwrap().balance
    }

    fn intent(source: &Iban, destination: &Iban, amount: i64) -> TransferIntent {
        TransferIntent {
            source: source.clone(),
            destination: destination.clone(),
            amount,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let (store, engine, ids) = setup(&[10_000, 5_000]).await;
        let (a, b) = (&ids[0], &ids[1]);

        let receipt = engine.transfer(intent(a, b, 3_000)).await.unwrap();
        assert_eq!(receipt.source_balance, 7_000);
        assert_eq!(receipt.amount, 3_000);
        assert_eq!(balance(&store, a).await, 7_000);
        assert_eq!(balance(&store, b).await, 8_000);

        let err = engine.transfer(intent(b, a, 100_000)).await.unwrap_err();
        assert!(matches!(err, TransferError::InsufficientFunds));
        assert_eq!(balance(&store, a).await, 7_000);
        assert_eq!(balance(&store, b).await, 8_000);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let (store, engine, ids) = setup(&[100, 100]).await;
        for amount in [0, -1, i64::MIN] {
            let err = engine.transfer(intent(&ids[0], &ids[1], amount)).await.unwrap_err();
            assert!(matches!(err, TransferError::InvalidAmount));
        }
        assert_eq!(balance(&store, &ids[0]).await, 100);
    }

    #[tokio::test]
    async fn test_self_transfer_rejected() {
        let (store, engine, ids) = setup(&[100]).await;
        let err = engine.transfer(intent(&ids[0], &ids[0], 10)).await.unwrap_err();
        assert!(matches!(err, TransferError::InvalidTransfer));
        assert_eq!(balance(&store, &ids[0]).await, 100);
    }

    #[tokio::test]
    async fn test_unknown_destination_changes_nothing() {
        let (store, engine, ids) = setup(&[100]).await;
        let ghost = IbanGenerator::new("NL", "LEDG")
            .unwrap()
            .for_account_number(999);

        let err = engine.transfer(intent(&ids[0], &ghost, 10)).await.unwrap_err();
        match err {
            TransferError::AccountNotFound { iban } => assert_eq!(iban, ghost),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(balance(&store, &ids[0]).await, 100);
    }

    #[tokio::test]
    async fn test_unknown_source_locked_first_changes_nothing() {
        let candidates = ibans(20);
        let ghost = candidates.iter().min().unwrap().clone();
        let destination = candidates.iter().max().unwrap().clone();
        assert!(ghost < destination);

        let store = MemoryAccountStore::new(Duration::from_secs(5));
        store.seed(destination.clone(), 100).await.unwrap();
        let engine = TransferEngine::new(Arc::new(store.clone()), Duration::from_secs(5));

        let err = engine.transfer(intent(&ghost, &destination, 10)).await.unwrap_err();
        match err {
            TransferError::AccountNotFound { iban } => assert_eq!(iban, ghost),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(balance(&store, &destination).await, 100);

        // Destination was never left locked
        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.lock_for_update(&destination).await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn test_destination_overflow_rejected() {
        let (store, engine, ids) = setup(&[100, i64::MAX - 5]).await;
        let err = engine.transfer(intent(&ids[0], &ids[1], 10)).await.unwrap_err();
        assert!(matches!(err, TransferError::BalanceOverflow));
        assert_eq!(balance(&store, &ids[0]).await, 100);
        assert_eq!(balance(&store, &ids[1]).await, i64::MAX - 5);
    }

    #[tokio::test]
    async fn test_exact_balance_can_be_drained() {
        let (store, engine, ids) = setup(&[250, 0]).await;
        let receipt = engine.transfer(intent(&ids[0], &ids[1], 250)).await.unwrap();
        assert_eq!(receipt.source_balance, 0);
        assert_eq!(balance(&store, &ids[1]).await, 250);
    }

    #[tokio::test]
    async fn test_timeout_while_row_is_held_rolls_back() {
        let store = MemoryAccountStore::new(Duration::from_secs(5));
        let ids = ibans(2);
        store.seed(ids[0].clone(), 100).await.unwrap();
        store.seed(ids[1].clone(), 100).await.unwrap();
        let engine = TransferEngine::new(Arc::new(store.clone()), Duration::from_millis(50));

        let mut blocker = store.begin().await.unwrap();
        blocker.lock_for_update(&ids[1]).await.unwrap();

        let err = engine.transfer(intent(&ids[0], &ids[1], 10)).await.unwrap_err();
        assert!(matches!(err, TransferError::LockTimeout));
        assert!(err.is_retryable());

        blocker.rollback().await.unwrap();
        assert_eq!(balance(&store, &ids[0]).await, 100);

        // The abandoned unit of work left nothing locked
        let receipt = engine.transfer(intent(&ids[0], &ids[1], 10)).await.unwrap();
        assert_eq!(receipt.source_balance, 90);
    }

    #[tokio::test]
    async fn test_store_lock_timeout_maps_to_lock_timeout() {
        let store = MemoryAccountStore::new(Duration::from_millis(30));
        let ids = ibans(2);
        store.seed(ids[0].clone(), 100).await.unwrap();
        store.seed(ids[1].clone(), 100).await.unwrap();
        let engine = TransferEngine::new(Arc::new(store.clone()), Duration::from_secs(5));

        let mut blocker = store.begin().await.unwrap();
        blocker.lock_for_update(&ids[0]).await.unwrap();

        let err = engine.transfer(intent(&ids[1], &ids[0], 10)).await.unwrap_err();
        assert!(matches!(err, TransferError::LockTimeout));
        drop(blocker);
        assert_eq!(balance(&store, &ids[1]).await, 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_direction_transfers_both_commit() {
        let (store, engine, ids) = setup(&[10_000, 10_000]).await;
        let rounds = 50;

        let tasks = (0..rounds).flat_map(|_| {
            let forward = {
                let engine = Arc::clone(&engine);
                let intent = intent(&ids[0], &ids[1], 7);
                tokio::spawn(async move { engine.transfer(intent).await })
            };
            let backward = {
                let engine = Arc::clone(&engine);
                let intent = intent(&ids[1], &ids[0], 3);
                tokio::spawn(async move { engine.transfer(intent).await })
            };
            [forward, backward]
        });

        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }
        assert_eq!(balance(&store, &ids[0]).await, 10_000 - rounds * 4);
        assert_eq!(balance(&store, &ids[1]).await, 10_000 + rounds * 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_debits_admit_exactly_what_balance_allows() {
        let (store, engine, ids) = setup(&[500, 0]).await;

        let tasks = (0..20).map(|_| {
            let engine = Arc::clone(&engine);
            let intent = intent(&ids[0], &ids[1], 100);
            tokio::spawn(async move { engine.transfer(intent).await })
        });

        let mut ok = 0;
        let mut insufficient = 0;
        for result in join_all(tasks).await {
            match result.unwrap() {
                Ok(_) => ok += 1,
                Err(TransferError::InsufficientFunds) => insufficient += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(ok, 5);
        assert_eq!(insufficient, 15);
        assert_eq!(balance(&store, &ids[0]).await, 0);
        assert_eq!(balance(&store, &ids[1]).await, 500);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_total_is_conserved_under_concurrent_mixed_transfers() {
        let (store, engine, ids) = setup(&[1_000, 2_000, 3_000, 4_000]).await;
        let total: i64 = 10_000;

        let tasks = (0..200usize).map(|i| {
            let engine = Arc::clone(&engine);
            let source = ids[i % 4].clone();
            let destination = ids[(i * 7 + 1) % 4].clone();
            let amount = (i as i64 % 13) * 37 + 1;
            tokio::spawn(async move {
                engine
                    .transfer(TransferIntent {
                        source,
                        destination,
                        amount,
                    })
                    .await
            })
        });

        for result in join_all(tasks).await {
            match result.unwrap() {
                Ok(_)
                | Err(TransferError::InsufficientFunds)
                | Err(TransferError::InvalidTransfer) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        let mut sum = 0;
        for iban in &ids {
            let b = balance(&store, iban).await;
            assert!(b >= 0);
            sum += b;
        }
        assert_eq!(sum, total);
    }
}
