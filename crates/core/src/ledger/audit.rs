//! Independent balance audits.
//!
//! The audit re-derives an account's balance and running-balance trail
//! from the transaction log via [`replay`](super::balance::replay) and
//! compares the result against the stored cached values. It never mutates
//! anything; repair is a separate, explicitly authorized operation on the
//! mutation service.

use finlog_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::balance::{replay, within_tolerance};
use super::effect::TransferLeg;
use super::error::LedgerError;
use super::types::{Account, Transaction};

/// Informational sanity heuristics. These flag unusual but not
/// necessarily incorrect states; they are never correctness failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanityFlag {
    /// An asset-category account carries a negative balance.
    NegativeAssetBalance,
    /// A liability-category account carries a positive balance.
    PositiveLiabilityBalance,
}

/// Per-account audit result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountAudit {
    /// The audited account.
    pub account_id: AccountId,
    /// True when the stored balance matches the calculated one within
    /// tolerance and no running balance is missing or stale.
    pub matches: bool,
    /// The cached balance on the account record.
    pub stored_balance: Decimal,
    /// The balance recomputed from the transaction log.
    pub calculated_balance: Decimal,
    /// Absolute difference between stored and calculated balance.
    pub difference: Decimal,
    /// Source-leg transactions with no persisted `signed_amount`, a
    /// precondition violation surfaced distinctly rather than silently
    /// treated as zero.
    pub missing_signed_amount: usize,
    /// Completed source-leg transactions with no persisted
    /// `running_balance`.
    pub missing_running_balance: usize,
    /// Completed source-leg transactions whose persisted
    /// `running_balance` disagrees with the replay beyond tolerance.
    pub stale_running_balance: usize,
    /// Informational sanity flags.
    pub flags: Vec<SanityFlag>,
}

impl AccountAudit {
    /// Converts a mismatching audit into the corresponding error.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` when the audit found drift.
    pub fn into_result(self) -> Result<Self, LedgerError> {
        if self.matches {
            Ok(self)
        } else {
            Err(LedgerError::InvariantViolation {
                account_id: self.account_id,
                stored: self.stored_balance,
                calculated: self.calculated_balance,
            })
        }
    }
}

/// Audits one account against its transaction log.
///
/// `transactions` must contain every transaction touching the account on
/// either leg; extra transactions for other accounts are ignored. The
/// comparison tolerance is one minor unit of the account's currency.
///
/// # Errors
///
/// Returns `InvalidAmount` if a stored transaction carries a non-positive
/// amount.
pub fn audit_account(
    account: &Account,
    transactions: &[Transaction],
) -> Result<AccountAudit, LedgerError> {
    let tolerance = account.currency.tolerance();
    let result = replay(account.id, transactions)?;

    let difference = (account.balance - result.balance).abs();
    let balance_matches = within_tolerance(account.balance, result.balance, tolerance);

    // The persisted running_balance field belongs to the source-account
    // trail; destination legs of transfers exist only in the replay.
    let missing_signed_amount = transactions
        .iter()
        .filter(|t| t.account_id == account.id && t.signed_amount.is_none())
        .count();

    let mut missing_running_balance = 0;
    let mut stale_running_balance = 0;
    for entry in result
        .entries
        .iter()
        .filter(|e| e.leg == TransferLeg::Source)
    {
        let stored = transactions
            .iter()
            .find(|t| t.id == entry.transaction_id)
            .and_then(|t| t.running_balance);
        match stored {
            None => missing_running_balance += 1,
            Some(value) if !within_tolerance(value, entry.running_balance, tolerance) => {
                stale_running_balance += 1;
            }
            Some(_) => {}
        }
    }

    let mut flags = Vec::new();
    let category = account.account_type.category();
    if category.is_liability() {
        if account.balance > Decimal::ZERO {
            flags.push(SanityFlag::PositiveLiabilityBalance);
        }
    } else if account.balance < Decimal::ZERO {
        flags.push(SanityFlag::NegativeAssetBalance);
    }

    Ok(AccountAudit {
        account_id: account.id,
        matches: balance_matches && missing_running_balance == 0 && stale_running_balance == 0,
        stored_balance: account.balance,
        calculated_balance: result.balance,
        difference,
        missing_signed_amount,
        missing_running_balance,
        stale_running_balance,
        flags,
    })
}
