//! Serializable ledger snapshots.
//!
//! Batch tooling (the reconcile job) exchanges ledger state as a plain
//! JSON document of accounts plus transactions.

use finlog_core::ledger::{Account, Transaction};
use serde::{Deserialize, Serialize};

/// A point-in-time copy of the whole ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// All accounts, ordered by id.
    pub accounts: Vec<Account>,
    /// All transactions, ordered by id.
    pub transactions: Vec<Transaction>,
}

impl LedgerSnapshot {
    /// Parses a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when the document is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the snapshot to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
