//! Versioned ledger store, mutation service, and reconciler for Finlog.
//!
//! This crate is the stateful half of the ledger consistency engine:
//!
//! - [`store`] - the versioned store whose `commit` is the atomic unit
//!   every mutation goes through
//! - [`service`] - the Ledger Mutation Service (create/update/delete/get)
//! - [`reconcile`] - the independent reconciliation pass and explicit
//!   repair
//! - [`snapshot`] - serializable ledger snapshots for batch tooling

pub mod reconcile;
pub mod service;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod service_tests;

pub use reconcile::{AuditReport, Reconciler};
pub use service::{LedgerService, ServiceConfig};
pub use snapshot::LedgerSnapshot;
pub use store::{MemoryLedgerStore, MutationBatch};
