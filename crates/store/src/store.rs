//! Versioned in-memory ledger store.
//!
//! The transaction log and the account balance cache are the only shared
//! mutable resources in the system, and [`MemoryLedgerStore::commit`] is
//! the single write path to them. A commit applies a whole
//! [`MutationBatch`] under one write lock, after checking the caller's
//! expected account versions; a mutation that read a since-superseded
//! account state fails with `ConcurrentModification` and must retry.
//! Readers never block writers for longer than a lock acquisition and
//! always observe a fully committed state.

use std::collections::HashMap;

use finlog_core::ledger::{Account, LedgerError, Transaction};
use finlog_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::snapshot::LedgerSnapshot;

#[derive(Debug, Default)]
struct StoreInner {
    accounts: HashMap<AccountId, Account>,
    transactions: HashMap<TransactionId, Transaction>,
}

/// In-memory ledger store with optimistic concurrency control.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    inner: RwLock<StoreInner>,
}

/// An all-or-nothing set of writes, applied atomically by
/// [`MemoryLedgerStore::commit`].
///
/// `expected_versions` carries the version of every account the mutation
/// read before computing the batch; versions are checked in ascending
/// account-id order, a fixed global order regardless of which account is
/// source or destination in the request.
#[derive(Debug, Default)]
pub struct MutationBatch {
    /// Account versions observed when the batch was computed.
    pub expected_versions: Vec<(AccountId, i64)>,
    /// Transactions to insert or replace.
    pub upsert_transactions: Vec<Transaction>,
    /// Transactions to remove.
    pub remove_transactions: Vec<TransactionId>,
    /// Per-transaction running balance patches (`None` clears).
    pub running_balances: Vec<(TransactionId, Option<Decimal>)>,
    /// New cached balances; each listed account's version is bumped.
    pub account_balances: Vec<(AccountId, Decimal)>,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a snapshot (batch tooling, tests).
    #[must_use]
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let inner = StoreInner {
            accounts: snapshot.accounts.into_iter().map(|a| (a.id, a)).collect(),
            transactions: snapshot
                .transactions
                .into_iter()
                .map(|t| (t.id, t))
                .collect(),
        };
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Registers an account. Account management is an external
    /// collaborator's concern; the store only needs the record to exist
    /// before transactions reference it.
    pub async fn insert_account(&self, account: Account) {
        let mut inner = self.inner.write().await;
        inner.accounts.insert(account.id, account);
    }

    /// Returns an account by id.
    pub async fn account(&self, id: AccountId) -> Option<Account> {
        let inner = self.inner.read().await;
        inner.accounts.get(&id).cloned()
    }

    /// Returns all accounts, ordered by id for deterministic iteration.
    pub async fn accounts(&self) -> Vec<Account> {
        let inner = self.inner.read().await;
        let mut accounts: Vec<Account> = inner.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.id);
        accounts
    }

    /// Returns a transaction by id.
    pub async fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        let inner = self.inner.read().await;
        inner.transactions.get(&id).cloned()
    }

    /// Returns every transaction touching the account on either leg.
    pub async fn transactions_for_account(&self, id: AccountId) -> Vec<Transaction> {
        let inner = self.inner.read().await;
        inner
            .transactions
            .values()
            .filter(|t| t.touches(id))
            .cloned()
            .collect()
    }

    /// Exports a consistent snapshot of the whole ledger, taken under a
    /// single read lock.
    pub async fn export(&self) -> LedgerSnapshot {
        let inner = self.inner.read().await;
        let mut accounts: Vec<Account> = inner.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.id);
        let mut transactions: Vec<Transaction> = inner.transactions.values().cloned().collect();
        transactions.sort_by_key(|t| t.id);
        LedgerSnapshot {
            accounts,
            transactions,
        }
    }

    /// Applies a mutation batch atomically.
    ///
    /// # Errors
    ///
    /// - `ConcurrentModification` when any expected account version is
    ///   stale; nothing is applied.
    /// - `AccountNotFound` when a referenced account does not exist.
    /// - `PersistenceFailure` when a running balance patch references an
    ///   unknown transaction.
    pub async fn commit(&self, batch: MutationBatch) -> Result<(), LedgerError> {
        let mut inner = self.inner.write().await;

        // Validation phase: nothing is mutated until every check passes,
        // so a rejected batch leaves the store exactly as it was.

        // Version checks, in ascending account-id order.
        let mut expected = batch.expected_versions;
        expected.sort_by_key(|(id, _)| *id);
        for (id, version) in &expected {
            let account = inner
                .accounts
                .get(id)
                .ok_or(LedgerError::AccountNotFound(*id))?;
            if account.version != *version {
                return Err(LedgerError::ConcurrentModification);
            }
        }

        // Every running-balance patch must target a transaction that will
        // exist after the batch: upserted here, or already stored and not
        // removed here.
        for (id, _) in &batch.running_balances {
            let upserted = batch.upsert_transactions.iter().any(|t| t.id == *id);
            let surviving = inner.transactions.contains_key(id)
                && !batch.remove_transactions.contains(id);
            if !upserted && !surviving {
                return Err(LedgerError::PersistenceFailure(format!(
                    "running balance patch references unknown transaction {id}"
                )));
            }
        }
        for (id, _) in &batch.account_balances {
            if !inner.accounts.contains_key(id) {
                return Err(LedgerError::AccountNotFound(*id));
            }
        }

        // Apply phase: infallible from here on.
        for id in &batch.remove_transactions {
            inner.transactions.remove(id);
        }
        for transaction in batch.upsert_transactions {
            inner.transactions.insert(transaction.id, transaction);
        }
        for (id, running_balance) in batch.running_balances {
            if let Some(transaction) = inner.transactions.get_mut(&id) {
                transaction.running_balance = running_balance;
            }
        }
        for (id, balance) in batch.account_balances {
            if let Some(account) = inner.accounts.get_mut(&id) {
                account.balance = balance;
                account.version += 1;
            }
        }

        Ok(())
    }
}
