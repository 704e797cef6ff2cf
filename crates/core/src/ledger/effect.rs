//! Signed monetary effect resolution.
//!
//! This is the single authority for sign conventions. Every component
//! that needs a transaction's effect on an account balance calls
//! [`signed_effect`] rather than re-deriving signs ad hoc.

use finlog_shared::types::AccountId;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::TransactionType;

/// One account's side of a transfer. A transfer has exactly two legs,
/// each contributing independently to its account's balance trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferLeg {
    /// The account money leaves (`account_id`).
    Source,
    /// The account money enters (`to_account_id`).
    Destination,
}

/// Computes a transaction's signed effect on one account's balance.
///
/// - income → `+amount`
/// - expense → `-amount`
/// - transfer, source leg → `-amount`
/// - transfer, destination leg → `+amount`
///
/// For income and expense the leg is ignored; they only have a source leg.
///
/// # Errors
///
/// Returns `InvalidAmount` when `amount` is not strictly positive.
pub fn signed_effect(
    transaction_type: TransactionType,
    amount: Decimal,
    leg: TransferLeg,
) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }

    Ok(match (transaction_type, leg) {
        (TransactionType::Income, _) | (TransactionType::Transfer, TransferLeg::Destination) => {
            amount
        }
        (TransactionType::Expense, _) | (TransactionType::Transfer, TransferLeg::Source) => {
            -amount
        }
    })
}

/// The signed effect on the primary (`account_id`) account, i.e. the value
/// persisted as `signed_amount`.
///
/// # Errors
///
/// Returns `InvalidAmount` when `amount` is not strictly positive.
pub fn source_signed_amount(
    transaction_type: TransactionType,
    amount: Decimal,
) -> Result<Decimal, LedgerError> {
    signed_effect(transaction_type, amount, TransferLeg::Source)
}

/// Validates a transaction's destination account reference.
///
/// # Errors
///
/// Returns `MissingDestination` when a transfer lacks a destination or the
/// destination equals the source (self-transfer is rejected).
pub fn validate_destination(
    transaction_type: TransactionType,
    account_id: AccountId,
    to_account_id: Option<AccountId>,
) -> Result<(), LedgerError> {
    match transaction_type {
        TransactionType::Transfer => match to_account_id {
            Some(to) if to != account_id => Ok(()),
            _ => Err(LedgerError::MissingDestination),
        },
        TransactionType::Income | TransactionType::Expense => Ok(()),
    }
}
