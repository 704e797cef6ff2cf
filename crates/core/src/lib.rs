//! Core ledger consistency logic for Finlog.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, balance calculations, and audit rules
//! live here.
//!
//! # Modules
//!
//! - `ledger` - Signed monetary effects, running balance replay, and audits

pub mod ledger;
