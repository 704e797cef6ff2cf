//! Ledger error types for validation, ownership, and concurrency errors.

use finlog_shared::types::{AccountId, Currency, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transaction amount must be strictly positive.
    #[error("Transaction amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Unrecognized transaction type at the deserialization boundary.
    #[error("Unrecognized transaction type: {0}")]
    InvalidType(String),

    /// Unrecognized transaction status at the deserialization boundary.
    #[error("Unrecognized transaction status: {0}")]
    InvalidStatus(String),

    /// Transfer is missing a destination account, or the destination is
    /// the source itself (self-transfer is rejected).
    #[error("Transfer requires a destination account distinct from the source")]
    MissingDestination,

    /// Transaction currency does not match the account's currency.
    #[error("Transaction currency {transaction} does not match account currency {account}")]
    CurrencyMismatch {
        /// Currency on the transaction.
        transaction: Currency,
        /// Currency of the account being posted to.
        account: Currency,
    },

    // ========== Entity / Ownership Errors ==========
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Caller does not own the requested resource.
    #[error("Caller does not own the requested resource")]
    Unauthorized,

    // ========== Concurrency / Persistence Errors ==========
    /// Optimistic-concurrency conflict; the mutation observed a stale
    /// account state and must retry.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    /// Transient persistence failure.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    // ========== Audit Errors ==========
    /// Drift between a stored balance and the balance recomputed from the
    /// transaction log. Only ever produced by the reconciliation pass,
    /// never raised mid-mutation.
    #[error(
        "Invariant violation for account {account_id}: stored {stored}, calculated {calculated}"
    )]
    InvariantViolation {
        /// The account whose stored balance drifted.
        account_id: AccountId,
        /// The cached balance on the account record.
        stored: Decimal,
        /// The balance recomputed from the transaction log.
        calculated: Decimal,
    },
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidType(_) => "INVALID_TYPE",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::MissingDestination => "MISSING_DESTINATION",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::NotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            Self::InvariantViolation { .. } => "INVARIANT_VIOLATION",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_)
            | Self::InvalidType(_)
            | Self::InvalidStatus(_)
            | Self::MissingDestination
            | Self::CurrencyMismatch { .. } => 400,

            // 403 Forbidden - ownership errors
            Self::Unauthorized => 403,

            // 404 Not Found
            Self::NotFound(_) | Self::AccountNotFound(_) => 404,

            // 409 Conflict - concurrency errors
            Self::ConcurrentModification => 409,

            // 500 Internal Server Error
            Self::PersistenceFailure(_) | Self::InvariantViolation { .. } => 500,
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Validation and ownership errors are surfaced verbatim; retryable
    /// errors are retried internally a bounded number of times with
    /// backoff before reaching the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification | Self::PersistenceFailure(_)
        )
    }
}
