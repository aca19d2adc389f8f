//! Outcome classification from goal counts

use crate::types::Outcome;
use serde::{Deserialize, Serialize};

/// Map a pair of goal counts to the categorical match result.
///
/// Total over all non-negative counts; validating raw input is the caller's job.
pub fn classify(player1_goals: u32, player2_goals: u32) -> Outcome {
    match player1_goals.cmp(&player2_goals) {
        std::cmp::Ordering::Greater => Outcome::Player1Win,
        std::cmp::Ordering::Less => Outcome::Player2Win,
        std::cmp::Ordering::Equal => Outcome::Draw,
    }
}

/// Result of a match as seen by one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SideResult {
    Win,
    Loss,
    Draw,
}

impl SideResult {
    pub fn from_goals(goals_for: u32, goals_against: u32) -> Self {
        match classify(goals_for, goals_against) {
            Outcome::Player1Win => SideResult::Win,
            Outcome::Player2Win => SideResult::Loss,
            Outcome::Draw => SideResult::Draw,
        }
    }

    /// League points: 3 for a win, 1 for a draw
    pub fn points(&self) -> u64 {
        match self {
            SideResult::Win => 3,
            SideResult::Draw => 1,
            SideResult::Loss => 0,
        }
    }
}

impl Outcome {
    /// Actual scores `(player1, player2)` fed into the rating formula
    pub fn actual_scores(&self) -> (f64, f64) {
        match self {
            Outcome::Player1Win => (1.0, 0.0),
            Outcome::Player2Win => (0.0, 1.0),
            Outcome::Draw => (0.5, 0.5),
        }
    }
}
