//! Rating calculator trait and test implementations
//!
//! The ledger only depends on this trait, so the formula can be swapped or
//! replaced with a scripted double in tests.

use crate::types::{Outcome, Rating, RatingDelta};
use std::sync::Mutex;

/// Trait for computing the rating delta of a single head-to-head match
pub trait RatingCalculator: Send + Sync {
    /// Delta for each side given both current ratings and the match outcome
    fn calculate_delta(&self, player1: Rating, player2: Rating, outcome: Outcome) -> RatingDelta;

    /// Rating assigned to newly registered players
    fn initial_rating(&self) -> Rating;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;
}

/// Mock rating calculator for testing
///
/// Returns a scripted delta when one is set, otherwise zero. Records every call.
#[derive(Debug, Default)]
pub struct MockRatingCalculator {
    calculation_calls: Mutex<Vec<(Rating, Rating, Outcome)>>,
    fixed_delta: Mutex<Option<RatingDelta>>,
    initial_rating: Rating,
}

impl MockRatingCalculator {
    pub fn new(initial_rating: Rating) -> Self {
        Self {
            initial_rating,
            ..Self::default()
        }
    }

    /// Set a fixed delta to return for all calculations
    pub fn set_fixed_delta(&self, delta: RatingDelta) {
        if let Ok(mut fixed) = self.fixed_delta.lock() {
            *fixed = Some(delta);
        }
    }

    /// Get all calculation calls made (for testing)
    pub fn get_calculation_calls(&self) -> Vec<(Rating, Rating, Outcome)> {
        self.calculation_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl RatingCalculator for MockRatingCalculator {
    fn calculate_delta(&self, player1: Rating, player2: Rating, outcome: Outcome) -> RatingDelta {
        if let Ok(mut calls) = self.calculation_calls.lock() {
            calls.push((player1, player2, outcome));
        }

        self.fixed_delta
            .lock()
            .ok()
            .and_then(|fixed| *fixed)
            .unwrap_or_default()
    }

    fn initial_rating(&self) -> Rating {
        self.initial_rating
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "mock",
            "initial_rating": self.initial_rating,
        })
    }
}
