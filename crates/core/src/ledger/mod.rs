//! Ledger consistency logic.
//!
//! This module implements the core ledger functionality:
//! - Signed monetary effect resolution (the single sign authority)
//! - Running balance replay in canonical order
//! - Domain types for accounts and transactions
//! - Error types for ledger operations
//! - Independent balance audits

pub mod audit;
pub mod balance;
pub mod effect;
pub mod error;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use audit::{AccountAudit, SanityFlag, audit_account};
pub use balance::{Replay, ReplayEntry, appends_at_tail, canonical_cmp, replay, within_tolerance};
pub use effect::{TransferLeg, signed_effect, source_signed_amount, validate_destination};
pub use error::LedgerError;
pub use types::{
    Account, AccountCategory, AccountType, CreateTransactionInput, Transaction, TransactionStatus,
    TransactionType, UpdateTransactionInput,
};
