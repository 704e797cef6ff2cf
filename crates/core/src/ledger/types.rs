//! Ledger domain types for accounts and transactions.
//!
//! Transaction `type` and `status` are closed enums, exhaustively matched
//! wherever a balance effect or sum inclusion is computed. Adding a new
//! type or status is therefore a compile-time-checked decision point, not
//! a runtime string comparison.

use chrono::{DateTime, NaiveDate, Utc};
use finlog_shared::types::{AccountId, Currency, TransactionId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Transaction type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money entering the account.
    Income,
    /// Money leaving the account.
    Expense,
    /// Money moving from one account to another.
    Transfer,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Income => write!(f, "income"),
            Self::Expense => write!(f, "expense"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(LedgerError::InvalidType(other.to_string())),
        }
    }
}

/// Transaction status.
///
/// Only `Completed` transactions participate in balance computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Transaction has been recorded but not yet completed.
    Pending,
    /// Transaction is completed and counts toward balances.
    Completed,
    /// Transaction was cancelled and never counts toward balances.
    Cancelled,
}

impl TransactionStatus {
    /// Returns true if transactions with this status participate in
    /// balance computation.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(LedgerError::InvalidStatus(other.to_string())),
        }
    }
}

/// Account type, a closed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Checking account.
    Checking,
    /// Savings account.
    Savings,
    /// Physical cash.
    Cash,
    /// Credit card.
    CreditCard,
    /// Personal loan.
    PersonalLoan,
    /// Mortgage.
    Mortgage,
    /// Car loan.
    CarLoan,
    /// Student loan.
    StudentLoan,
    /// Stock holdings.
    Stocks,
    /// Retirement account.
    Retirement,
    /// Cryptocurrency holdings.
    Crypto,
    /// Mutual funds.
    MutualFunds,
    /// Real estate.
    RealEstate,
    /// Vehicle.
    Vehicle,
    /// Valuables (jewelry, collectibles, ...).
    Valuables,
    /// Other assets.
    OtherAssets,
}

impl AccountType {
    /// Derived grouping used only for audit sanity heuristics, never for
    /// balance math.
    #[must_use]
    pub const fn category(self) -> AccountCategory {
        match self {
            Self::Checking | Self::Savings | Self::Cash => AccountCategory::Bank,
            Self::CreditCard
            | Self::PersonalLoan
            | Self::Mortgage
            | Self::CarLoan
            | Self::StudentLoan => AccountCategory::CreditLoans,
            Self::Stocks | Self::Retirement | Self::Crypto | Self::MutualFunds => {
                AccountCategory::Investments
            }
            Self::RealEstate | Self::Vehicle | Self::Valuables | Self::OtherAssets => {
                AccountCategory::Assets
            }
        }
    }
}

/// Account category derived from the account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    /// Day-to-day bank accounts and cash.
    Bank,
    /// Credit cards and loans.
    CreditLoans,
    /// Investment holdings.
    Investments,
    /// Physical and other assets.
    Assets,
}

impl AccountCategory {
    /// Returns true for categories that normally carry a negative
    /// (owed) balance.
    #[must_use]
    pub const fn is_liability(self) -> bool {
        matches!(self, Self::CreditLoans)
    }
}

/// A financial account.
///
/// `balance` is a derived cache, not a source of truth: it always equals
/// the sum of signed effects of the account's completed transactions, as
/// maintained by the mutation service and verified by the auditor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owner of the account.
    pub owner_id: UserId,
    /// Account type.
    pub account_type: AccountType,
    /// Currency the balance is denominated in.
    pub currency: Currency,
    /// Cached balance derived from the transaction log.
    pub balance: Decimal,
    /// Optimistic-concurrency version, bumped on every committed mutation
    /// that touches this account's balance.
    pub version: i64,
}

impl Account {
    /// Creates a new account with a zero balance.
    #[must_use]
    pub fn new(owner_id: UserId, account_type: AccountType, currency: Currency) -> Self {
        Self {
            id: AccountId::new(),
            owner_id,
            account_type,
            currency,
            balance: Decimal::ZERO,
            version: 0,
        }
    }
}

/// A transaction in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Owner of the transaction.
    pub owner_id: UserId,
    /// Transaction type.
    pub transaction_type: TransactionType,
    /// The primary (source, for transfers) account affected.
    pub account_id: AccountId,
    /// Destination account; present only for transfers.
    pub to_account_id: Option<AccountId>,
    /// Strictly positive amount in the transaction's currency.
    pub amount: Decimal,
    /// The signed effect on `account_id`'s balance. Persisted redundantly
    /// for performance; always re-derivable from `{transaction_type,
    /// amount}`. `None` is a precondition violation the auditor surfaces.
    pub signed_amount: Option<Decimal>,
    /// Transaction currency; must equal the source account's currency.
    pub currency: Currency,
    /// Effective/business date, the primary sort key.
    pub date: NaiveDate,
    /// Wall-clock insertion time, the tie-break sort key.
    pub created_at: DateTime<Utc>,
    /// Transaction status.
    pub status: TransactionStatus,
    /// Prefix sum of signed effects over the source account's completed
    /// transactions up to and including this one, in canonical order.
    /// Present only when the transaction is completed.
    pub running_balance: Option<Decimal>,
    /// Free-form description.
    pub description: Option<String>,
}

impl Transaction {
    /// Returns true if this transaction contributes to `account_id`'s
    /// balance trail on either leg.
    #[must_use]
    pub fn touches(&self, account_id: AccountId) -> bool {
        self.account_id == account_id || self.to_account_id == Some(account_id)
    }
}

/// Input for creating a new transaction.
///
/// Produced by external collaborators which have already authenticated the
/// caller and validated field formats; the mutation service still enforces
/// the ledger-level rules (positive amount, destination, ownership,
/// currency).
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    /// Transaction type.
    pub transaction_type: TransactionType,
    /// The primary (source) account.
    pub account_id: AccountId,
    /// Destination account for transfers.
    pub to_account_id: Option<AccountId>,
    /// Amount (must be strictly positive).
    pub amount: Decimal,
    /// Transaction currency.
    pub currency: Currency,
    /// Effective/business date.
    pub date: NaiveDate,
    /// Initial status.
    pub status: TransactionStatus,
    /// Free-form description.
    pub description: Option<String>,
}

/// Partial update of an existing transaction.
///
/// `None` fields are left unchanged. For `to_account_id` and
/// `description` the outer `Option` is the unchanged marker and the inner
/// one the new value, so both "leave as-is" and "clear" are expressible.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    /// New amount.
    pub amount: Option<Decimal>,
    /// New transaction type.
    pub transaction_type: Option<TransactionType>,
    /// New status.
    pub status: Option<TransactionStatus>,
    /// New source account.
    pub account_id: Option<AccountId>,
    /// New destination account (outer `None` = unchanged).
    pub to_account_id: Option<Option<AccountId>>,
    /// New business date.
    pub date: Option<NaiveDate>,
    /// New description (outer `None` = unchanged).
    pub description: Option<Option<String>>,
}

impl UpdateTransactionInput {
    /// Returns true if the update touches a field that feeds balance
    /// computation (amount, type, status, or account membership).
    ///
    /// Date changes also force a full replay, since they can reorder the
    /// prefix-sum sequence, and are therefore included.
    #[must_use]
    pub const fn affects_balances(&self) -> bool {
        self.amount.is_some()
            || self.transaction_type.is_some()
            || self.status.is_some()
            || self.account_id.is_some()
            || self.to_account_id.is_some()
            || self.date.is_some()
    }
}
