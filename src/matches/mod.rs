//! Match records
//!
//! Durable records of recorded matches, each carrying the rating delta that
//! was committed when the match was applied.

pub mod store;

pub use store::{InMemoryMatchStore, MatchStore};

#[cfg(test)]
pub use store::MockMatchStore;
