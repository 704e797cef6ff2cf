//! Reconciliation auditor.
//!
//! Read-only verification that every account's cached balance (and
//! running-balance trail) agrees with a full replay of its transactions.
//! Auditing never mutates; healing a drifted account is an explicit,
//! separate call into the mutation service's recalculation path.

use std::sync::Arc;

use finlog_core::ledger::{AccountAudit, LedgerError, audit_account};
use finlog_shared::types::AccountId;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::service::LedgerService;
use crate::store::MemoryLedgerStore;

/// Outcome of auditing every account in the ledger.
#[derive(Debug)]
pub struct AuditReport {
    /// One entry per auditable account, ordered by account id.
    pub accounts: Vec<AccountAudit>,
    /// Accounts whose audit could not run at all, e.g. a stored
    /// transaction with a non-positive amount. A failure on one account
    /// never stops the sweep over the others.
    pub failures: Vec<(AccountId, LedgerError)>,
}

impl AuditReport {
    /// True when every account audited, and every audit matched.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.accounts.iter().all(|a| a.matches)
    }

    /// The audits that found drift.
    pub fn mismatches(&self) -> impl Iterator<Item = &AccountAudit> {
        self.accounts.iter().filter(|a| !a.matches)
    }

    /// Converts the report into an error when any account failed to audit
    /// or drifted.
    ///
    /// # Errors
    ///
    /// Returns the first audit failure, then the first mismatch as an
    /// `InvariantViolation`.
    pub fn into_result(self) -> Result<(), LedgerError> {
        if let Some((_, error)) = self.failures.into_iter().next() {
            return Err(error);
        }
        for audit in self.accounts {
            audit.into_result()?;
        }
        Ok(())
    }
}

/// Read-only auditor over a ledger store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<MemoryLedgerStore>,
}

impl Reconciler {
    /// Creates an auditor over the given store.
    #[must_use]
    pub fn new(store: Arc<MemoryLedgerStore>) -> Self {
        Self { store }
    }

    /// Audits a single account against a replay of its transactions.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` when the account does not exist.
    pub async fn audit_account(&self, account_id: AccountId) -> Result<AccountAudit, LedgerError> {
        let account = self
            .store
            .account(account_id)
            .await
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        let transactions = self.store.transactions_for_account(account_id).await;
        let audit = audit_account(&account, &transactions)?;
        if !audit.matches {
            warn!(
                account_id = %account_id,
                stored = %audit.stored_balance,
                calculated = %audit.calculated_balance,
                "account drifted from replayed balance"
            );
        }
        Ok(audit)
    }

    /// Audits every account from one consistent snapshot of the store.
    /// An account whose audit cannot run is recorded in the report's
    /// `failures` and the sweep continues with the remaining accounts.
    pub async fn audit_all(&self) -> AuditReport {
        let snapshot = self.store.export().await;
        let mut accounts = Vec::with_capacity(snapshot.accounts.len());
        let mut failures = Vec::new();
        for account in &snapshot.accounts {
            let transactions: Vec<_> = snapshot
                .transactions
                .iter()
                .filter(|t| t.touches(account.id))
                .cloned()
                .collect();
            match audit_account(account, &transactions) {
                Ok(audit) => accounts.push(audit),
                Err(error) => {
                    warn!(account_id = %account.id, error = %error, "account audit failed");
                    failures.push((account.id, error));
                }
            }
        }
        let report = AuditReport { accounts, failures };
        info!(
            audited = report.accounts.len(),
            mismatches = report.mismatches().count(),
            failed = report.failures.len(),
            "reconciliation sweep complete"
        );
        report
    }

    /// Repairs one drifted account by recomputing its cached state
    /// through the mutation service, then returns the healed balance.
    ///
    /// # Errors
    ///
    /// Propagates the recalculation failure.
    pub async fn repair(
        &self,
        service: &LedgerService,
        account_id: AccountId,
    ) -> Result<Decimal, LedgerError> {
        info!(account_id = %account_id, "repairing drifted account");
        service.recalculate(account_id).await
    }
}
