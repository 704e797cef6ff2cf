//! Ledger mutation service.
//!
//! The transactional boundary for create/update/delete of a transaction.
//! Every operation follows the same shape: read a versioned snapshot of
//! the affected accounts, compute the new balances outside any lock, and
//! commit the whole result as one [`MutationBatch`]. A commit that
//! observed a stale account version fails with `ConcurrentModification`
//! and is retried internally with backoff, so two concurrent mutations of
//! the same account can never both apply against the same pre-mutation
//! balance.
//!
//! Recomputation policy: appending a completed transaction that sorts
//! after every existing completed one updates the tail incrementally; any
//! mutation that can affect ordering or membership anywhere in the middle
//! of the canonical order falls back to a full replay instead of
//! attempting delta math.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use finlog_core::ledger::{
    Account, CreateTransactionInput, LedgerError, Transaction, TransactionType, TransferLeg,
    UpdateTransactionInput, balance, effect,
};
use finlog_shared::config::LedgerConfig;
use finlog_shared::types::{AccountId, TransactionId, UserId};
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::store::{MemoryLedgerStore, MutationBatch};

/// Retry policy for retryable mutation failures.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum internal retries before surfacing a retryable error.
    pub max_retries: u32,
    /// Base backoff between retries; grows linearly with the attempt.
    pub retry_backoff: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for ServiceConfig {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// The ledger mutation service.
///
/// Exposes the four public operations consumed by outer layers (HTTP,
/// batch jobs): `create`, `update`, `delete`, and `get_by_id`, plus the
/// `recalculate` full-replay path the reconciler's repair step invokes.
#[derive(Debug, Clone)]
pub struct LedgerService {
    store: Arc<MemoryLedgerStore>,
    config: ServiceConfig,
}

impl LedgerService {
    /// Creates a service over the given store.
    #[must_use]
    pub fn new(store: Arc<MemoryLedgerStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// Creates a new transaction and brings the affected account(s)'
    /// balances and running-balance trails up to date in one atomic unit.
    /// For a transfer both accounts are updated in the same commit;
    /// partial application is never observable.
    #[instrument(skip(self, input), fields(account_id = %input.account_id))]
    pub async fn create(
        &self,
        owner: UserId,
        input: CreateTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        self.with_retries(|| self.try_create(owner, &input)).await
    }

    /// Applies a partial update. Any change to amount, type, status,
    /// account membership, or date re-derives the signed amount and
    /// replays every account affected before and after the change.
    #[instrument(skip(self, patch), fields(transaction_id = %id))]
    pub async fn update(
        &self,
        owner: UserId,
        id: TransactionId,
        patch: UpdateTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        self.with_retries(|| self.try_update(owner, id, &patch))
            .await
    }

    /// Deletes a transaction and replays every account it touched.
    #[instrument(skip(self), fields(transaction_id = %id))]
    pub async fn delete(&self, owner: UserId, id: TransactionId) -> Result<(), LedgerError> {
        self.with_retries(|| self.try_delete(owner, id)).await
    }

    /// Returns a transaction when it exists and belongs to the caller.
    pub async fn get_by_id(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        self.transaction_owned_by(id, owner).await
    }

    /// Recomputes one account's balance and running-balance trail from
    /// scratch, also re-deriving any missing or stale `signed_amount`.
    /// This is the repair path; it returns the recomputed balance.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn recalculate(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        self.with_retries(|| self.try_recalculate(account_id)).await
    }

    async fn with_retries<T, F, Fut>(&self, mut op: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %err, "retryable mutation failure, backing off");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                result => return result,
            }
        }
    }

    async fn try_create(
        &self,
        owner: UserId,
        input: &CreateTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        effect::validate_destination(
            input.transaction_type,
            input.account_id,
            input.to_account_id,
        )?;
        let signed = effect::source_signed_amount(input.transaction_type, input.amount)?;

        let source = self.account_owned_by(input.account_id, owner).await?;
        if input.currency != source.currency {
            return Err(LedgerError::CurrencyMismatch {
                transaction: input.currency,
                account: source.currency,
            });
        }
        let destination = if input.transaction_type == TransactionType::Transfer {
            let to = input.to_account_id.ok_or(LedgerError::MissingDestination)?;
            Some(self.account_owned_by(to, owner).await?)
        } else {
            // A stray destination on income/expense is dropped.
            None
        };

        let transaction = Transaction {
            id: TransactionId::new(),
            owner_id: owner,
            transaction_type: input.transaction_type,
            account_id: source.id,
            to_account_id: destination.as_ref().map(|a| a.id),
            amount: input.amount,
            signed_amount: Some(signed),
            currency: input.currency,
            date: input.date,
            created_at: Utc::now(),
            status: input.status,
            running_balance: None,
            description: input.description.clone(),
        };

        let mut batch = MutationBatch {
            upsert_transactions: vec![transaction.clone()],
            ..Default::default()
        };

        let mut affected = vec![source];
        affected.extend(destination);
        for account in &affected {
            batch.expected_versions.push((account.id, account.version));
            if !transaction.status.is_completed() {
                // Pending and cancelled transactions never move balances.
                continue;
            }

            let existing = self.store.transactions_for_account(account.id).await;
            if balance::appends_at_tail(&transaction, &existing, account.id) {
                let leg = if transaction.account_id == account.id {
                    TransferLeg::Source
                } else {
                    TransferLeg::Destination
                };
                let step = effect::signed_effect(
                    transaction.transaction_type,
                    transaction.amount,
                    leg,
                )?;
                let new_balance = account.balance + step;
                batch.account_balances.push((account.id, new_balance));
                if leg == TransferLeg::Source {
                    batch
                        .running_balances
                        .push((transaction.id, Some(new_balance)));
                }
                debug!(account_id = %account.id, "appended at tail, incremental balance update");
            } else {
                let mut projected = existing;
                projected.push(transaction.clone());
                Self::replay_into_batch(&mut batch, account.id, &projected)?;
                debug!(account_id = %account.id, "mid-trail insert, full replay");
            }
        }

        self.store.commit(batch).await?;
        self.stored_transaction(transaction.id).await
    }

    async fn try_update(
        &self,
        owner: UserId,
        id: TransactionId,
        patch: &UpdateTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        let existing = self.transaction_owned_by(id, owner).await?;

        let mut updated = existing.clone();
        if let Some(amount) = patch.amount {
            updated.amount = amount;
        }
        if let Some(transaction_type) = patch.transaction_type {
            updated.transaction_type = transaction_type;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(account_id) = patch.account_id {
            updated.account_id = account_id;
        }
        if let Some(to_account_id) = patch.to_account_id {
            updated.to_account_id = to_account_id;
        }
        if let Some(date) = patch.date {
            updated.date = date;
        }
        if let Some(ref description) = patch.description {
            updated.description = description.clone();
        }

        effect::validate_destination(
            updated.transaction_type,
            updated.account_id,
            updated.to_account_id,
        )?;
        if updated.transaction_type != TransactionType::Transfer {
            updated.to_account_id = None;
        }
        updated.signed_amount = Some(effect::source_signed_amount(
            updated.transaction_type,
            updated.amount,
        )?);

        let source = self.account_owned_by(updated.account_id, owner).await?;
        if updated.currency != source.currency {
            return Err(LedgerError::CurrencyMismatch {
                transaction: updated.currency,
                account: source.currency,
            });
        }
        if let Some(to) = updated.to_account_id {
            self.account_owned_by(to, owner).await?;
        }

        if !patch.affects_balances() {
            // Metadata-only edit: the trail is untouched.
            let batch = MutationBatch {
                expected_versions: vec![(source.id, source.version)],
                upsert_transactions: vec![updated],
                ..Default::default()
            };
            self.store.commit(batch).await?;
            return self.stored_transaction(id).await;
        }

        // Every account affected before or after the change replays in
        // full; an edit can reorder the prefix-sum sequence anywhere.
        updated.running_balance = None;
        let mut affected = BTreeSet::new();
        affected.insert(existing.account_id);
        affected.extend(existing.to_account_id);
        affected.insert(updated.account_id);
        affected.extend(updated.to_account_id);

        let mut batch = MutationBatch {
            upsert_transactions: vec![updated.clone()],
            ..Default::default()
        };
        for account_id in affected {
            let account = self
                .store
                .account(account_id)
                .await
                .ok_or(LedgerError::AccountNotFound(account_id))?;
            batch.expected_versions.push((account.id, account.version));

            let mut projected = self.store.transactions_for_account(account_id).await;
            projected.retain(|t| t.id != updated.id);
            if updated.touches(account_id) {
                projected.push(updated.clone());
            }
            Self::replay_into_batch(&mut batch, account_id, &projected)?;
        }

        self.store.commit(batch).await?;
        self.stored_transaction(id).await
    }

    async fn try_delete(&self, owner: UserId, id: TransactionId) -> Result<(), LedgerError> {
        let existing = self.transaction_owned_by(id, owner).await?;

        let mut affected = BTreeSet::new();
        affected.insert(existing.account_id);
        affected.extend(existing.to_account_id);

        let mut batch = MutationBatch {
            remove_transactions: vec![existing.id],
            ..Default::default()
        };
        for account_id in affected {
            let account = self
                .store
                .account(account_id)
                .await
                .ok_or(LedgerError::AccountNotFound(account_id))?;
            batch.expected_versions.push((account.id, account.version));

            let mut projected = self.store.transactions_for_account(account_id).await;
            projected.retain(|t| t.id != existing.id);
            Self::replay_into_batch(&mut batch, account_id, &projected)?;
        }

        self.store.commit(batch).await
    }

    async fn try_recalculate(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        let account = self
            .store
            .account(account_id)
            .await
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        let transactions = self.store.transactions_for_account(account_id).await;

        let mut batch = MutationBatch {
            expected_versions: vec![(account.id, account.version)],
            ..Default::default()
        };

        // Re-derive signed amounts for the account's own transactions so
        // repair also heals missing or stale precomputed values.
        for transaction in &transactions {
            if transaction.account_id == account_id {
                let derived = effect::source_signed_amount(
                    transaction.transaction_type,
                    transaction.amount,
                )?;
                if transaction.signed_amount != Some(derived) {
                    let mut fixed = transaction.clone();
                    fixed.signed_amount = Some(derived);
                    batch.upsert_transactions.push(fixed);
                }
            }
        }

        Self::replay_into_batch(&mut batch, account_id, &transactions)?;
        self.store.commit(batch).await?;

        self.store
            .account(account_id)
            .await
            .map(|a| a.balance)
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Full replay of one account: records the recomputed cached balance,
    /// the running balance of every completed source-leg transaction, and
    /// clears the running balance of non-completed source-leg ones.
    fn replay_into_batch(
        batch: &mut MutationBatch,
        account_id: AccountId,
        projected: &[Transaction],
    ) -> Result<(), LedgerError> {
        let replay = balance::replay(account_id, projected)?;
        batch.account_balances.push((account_id, replay.balance));

        for entry in &replay.entries {
            if entry.leg == TransferLeg::Source {
                batch
                    .running_balances
                    .push((entry.transaction_id, Some(entry.running_balance)));
            }
        }
        for transaction in projected {
            if transaction.account_id == account_id && !transaction.status.is_completed() {
                batch.running_balances.push((transaction.id, None));
            }
        }
        Ok(())
    }

    async fn account_owned_by(
        &self,
        id: AccountId,
        owner: UserId,
    ) -> Result<Account, LedgerError> {
        let account = self
            .store
            .account(id)
            .await
            .ok_or(LedgerError::AccountNotFound(id))?;
        if account.owner_id != owner {
            return Err(LedgerError::Unauthorized);
        }
        Ok(account)
    }

    async fn transaction_owned_by(
        &self,
        id: TransactionId,
        owner: UserId,
    ) -> Result<Transaction, LedgerError> {
        let transaction = self
            .store
            .transaction(id)
            .await
            .ok_or(LedgerError::NotFound(id))?;
        if transaction.owner_id != owner {
            return Err(LedgerError::Unauthorized);
        }
        Ok(transaction)
    }

    async fn stored_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.store.transaction(id).await.ok_or_else(|| {
            LedgerError::PersistenceFailure(format!("transaction {id} missing after commit"))
        })
    }
}
