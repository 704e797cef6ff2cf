//! Shared types and configuration for Finlog.
//!
//! This crate contains the primitives every other Finlog crate depends on:
//! typed entity IDs, currency definitions, and application configuration.
//! It has no business logic of its own.

pub mod config;
pub mod types;

pub use config::{AppConfig, LedgerConfig, ReconcileConfig};
pub use types::{AccountId, Currency, TransactionId, UserId};
