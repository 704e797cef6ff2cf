//! Shared domain primitives.

pub mod id;
pub mod money;

pub use id::{AccountId, TransactionId, UserId};
pub use money::Currency;
