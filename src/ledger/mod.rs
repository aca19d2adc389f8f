//! Rating ledger
//!
//! The only component allowed to change player ratings. Every change is a
//! ledger transaction executed under per-player locks and committed as a
//! single batch to the rating store.

pub mod engine;
pub mod locks;
pub mod transaction;

pub use engine::RatingLedger;
pub use locks::{LockSet, LockTable};
pub use transaction::{AppliedOutcome, LedgerTransaction, TransactionKind, TransactionReceipt};
