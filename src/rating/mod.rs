//! Rating formula and rating storage
//!
//! This module provides outcome classification, the Elo delta calculation
//! built on the skillratings crate, and the storage boundary the ledger uses
//! to read and persist ratings.

pub mod calculator;
pub mod classifier;
pub mod elo;
pub mod storage;

// Re-export commonly used types
pub use calculator::{MockRatingCalculator, RatingCalculator};
pub use classifier::{classify, SideResult};
pub use elo::{EloRatingCalculator, ExtendedEloConfig, RoundingRule};
pub use storage::{InMemoryRatingStore, RatingEntry, RatingStore, RatingUpdate};
