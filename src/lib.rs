//! Rivalry Ledger - head-to-head match ledger with reversible Elo ratings
//!
//! This crate records matches between two players and keeps an Elo rating
//! per player. Every rating change goes through a ledger transaction that can
//! be exactly reverted or replaced later, so matches can be edited and
//! deleted without corrupting the ratings of anyone else.

pub mod config;
pub mod error;
pub mod ledger;
pub mod matches;
pub mod metrics;
pub mod rating;
pub mod replay;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LedgerError, Result};
pub use types::*;

// Re-export key components
pub use ledger::RatingLedger;
pub use matches::{InMemoryMatchStore, MatchStore};
pub use rating::{EloRatingCalculator, InMemoryRatingStore, RatingStore};
pub use service::MatchService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
