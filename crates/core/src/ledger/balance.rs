//! Running balance replay in canonical order.
//!
//! Both the mutation service and the auditor derive balances through this
//! module, so the two can never disagree on ordering. The canonical order
//! is ascending `(date, created_at, id)`: the business date is the primary
//! key, insertion time breaks same-day ties, and the id breaks any
//! remaining ties deterministically.

use std::cmp::Ordering;

use finlog_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;

use super::effect::{TransferLeg, signed_effect};
use super::error::LedgerError;
use super::types::Transaction;

/// The canonical replay ordering: ascending `(date, created_at, id)`.
#[must_use]
pub fn canonical_cmp(a: &Transaction, b: &Transaction) -> Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// One completed transaction's position in an account's balance trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEntry {
    /// The transaction.
    pub transaction_id: TransactionId,
    /// True when the replayed account is the transaction's source
    /// (`account_id`) side; transfers into the account replay on the
    /// destination leg instead.
    pub leg: TransferLeg,
    /// The signed effect applied at this step.
    pub signed_effect: Decimal,
    /// Prefix sum of signed effects up to and including this transaction.
    pub running_balance: Decimal,
}

/// The result of replaying one account's transaction log.
#[derive(Debug, Clone)]
pub struct Replay {
    /// Per-transaction running balances, in canonical order. Only
    /// completed transactions appear; pending and cancelled ones do not
    /// advance the trail.
    pub entries: Vec<ReplayEntry>,
    /// The account's balance after the last completed transaction.
    pub balance: Decimal,
}

/// Replays an account's transactions in canonical order, producing the
/// running balance of every completed transaction and the final balance.
///
/// Transactions are included when they touch the account on *either* leg:
/// a transfer contributes to both the source and the destination account's
/// trail, once per account, with the leg-appropriate sign.
///
/// # Errors
///
/// Returns `InvalidAmount` if a stored transaction carries a non-positive
/// amount (a precondition violation upstream).
pub fn replay(account_id: AccountId, transactions: &[Transaction]) -> Result<Replay, LedgerError> {
    let mut relevant: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.touches(account_id))
        .collect();
    relevant.sort_by(|a, b| canonical_cmp(a, b));

    let mut running = Decimal::ZERO;
    let mut entries = Vec::new();

    for transaction in relevant {
        if !transaction.status.is_completed() {
            continue;
        }

        let leg = if transaction.account_id == account_id {
            TransferLeg::Source
        } else {
            TransferLeg::Destination
        };
        let effect = signed_effect(transaction.transaction_type, transaction.amount, leg)?;
        running += effect;

        entries.push(ReplayEntry {
            transaction_id: transaction.id,
            leg,
            signed_effect: effect,
            running_balance: running,
        });
    }

    Ok(Replay {
        entries,
        balance: running,
    })
}

/// Returns true when `candidate` sorts after every completed transaction
/// already touching `account_id`, i.e. when an append-only incremental
/// balance update is safe for that account.
#[must_use]
pub fn appends_at_tail(
    candidate: &Transaction,
    existing: &[Transaction],
    account_id: AccountId,
) -> bool {
    existing
        .iter()
        .filter(|t| t.id != candidate.id && t.touches(account_id) && t.status.is_completed())
        .all(|t| canonical_cmp(t, candidate) == Ordering::Less)
}

/// Reconciliation equality: two values match when they differ by no more
/// than the given tolerance (at most one minor currency unit).
#[must_use]
pub fn within_tolerance(stored: Decimal, calculated: Decimal, tolerance: Decimal) -> bool {
    (stored - calculated).abs() <= tolerance
}
