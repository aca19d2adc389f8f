//! Common types used throughout the rating ledger

use crate::error::{LedgerError, Result};
use crate::rating::classifier::{classify, SideResult};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for recorded matches
pub type MatchId = Uuid;

/// Stored rating value, kept at whole-point granularity
pub type Rating = i64;

/// Categorical result of a match from player 1's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Player1Win,
    Player2Win,
    Draw,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Player1Win => write!(f, "player1_win"),
            Outcome::Player2Win => write!(f, "player2_win"),
            Outcome::Draw => write!(f, "draw"),
        }
    }
}

/// Goals scored by each side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchScore {
    pub player1_goals: u32,
    pub player2_goals: u32,
}

impl MatchScore {
    pub fn new(player1_goals: u32, player2_goals: u32) -> Self {
        Self {
            player1_goals,
            player2_goals,
        }
    }

    /// Build a score from raw request values, rejecting negative or oversized counts
    pub fn try_from_goals(player1_goals: i64, player2_goals: i64) -> Result<Self> {
        let convert = |goals: i64, side: &str| {
            u32::try_from(goals).map_err(|_| LedgerError::InvalidScore {
                reason: format!("{} goals must be a non-negative count, got {}", side, goals),
            })
        };

        Ok(Self {
            player1_goals: convert(player1_goals, "player1")?,
            player2_goals: convert(player2_goals, "player2")?,
        })
    }

    pub fn outcome(&self) -> Outcome {
        classify(self.player1_goals, self.player2_goals)
    }

    /// Goal difference from player 1's point of view
    pub fn goal_difference(&self) -> i64 {
        i64::from(self.player1_goals) - i64::from(self.player2_goals)
    }
}

impl std::fmt::Display for MatchScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.player1_goals, self.player2_goals)
    }
}

/// Signed rating change applied to each participant of one match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RatingDelta {
    pub player1: i64,
    pub player2: i64,
}

impl RatingDelta {
    pub fn new(player1: i64, player2: i64) -> Self {
        Self { player1, player2 }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn negated(&self) -> Self {
        Self {
            player1: -self.player1,
            player2: -self.player2,
        }
    }

    /// Total rating created or destroyed by this delta (zero when perfectly balanced)
    pub fn net(&self) -> i64 {
        self.player1 + self.player2
    }

    /// Check that the pair is a transfer: opposite signs and a net within `tolerance`
    pub fn validate(&self, tolerance: i64) -> Result<()> {
        if self.player1.signum() * self.player2.signum() > 0 {
            return Err(LedgerError::InconsistentStoredDelta {
                player1: self.player1,
                player2: self.player2,
                reason: "both sides moved in the same direction".to_string(),
            });
        }

        if self.net().abs() > tolerance {
            return Err(LedgerError::InconsistentStoredDelta {
                player1: self.player1,
                player2: self.player2,
                reason: format!(
                    "net change {} exceeds rounding tolerance {}",
                    self.net(),
                    tolerance
                ),
            });
        }

        Ok(())
    }
}

impl std::fmt::Display for RatingDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:+}, {:+})", self.player1, self.player2)
    }
}

/// The rating-relevant part of a match: who played and what the score was
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    pub score: MatchScore,
}

impl MatchOutcome {
    pub fn new(
        player1_id: impl Into<PlayerId>,
        player2_id: impl Into<PlayerId>,
        score: MatchScore,
    ) -> Self {
        Self {
            player1_id: player1_id.into(),
            player2_id: player2_id.into(),
            score,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.score.outcome()
    }

    /// Same participants in the same seats, different score
    pub fn with_score(&self, score: MatchScore) -> Self {
        Self {
            player1_id: self.player1_id.clone(),
            player2_id: self.player2_id.clone(),
            score,
        }
    }

    pub fn same_participants(&self, other: &MatchOutcome) -> bool {
        self.player1_id == other.player1_id && self.player2_id == other.player2_id
    }

    /// Reject matches that cannot be a head-to-head between two players
    pub fn validate(&self) -> Result<()> {
        if self.player1_id.trim().is_empty() || self.player2_id.trim().is_empty() {
            return Err(LedgerError::InvalidMatch {
                reason: "player ids must not be empty".to_string(),
            });
        }
        if self.player1_id == self.player2_id {
            return Err(LedgerError::InvalidMatch {
                reason: format!("player '{}' cannot play against themselves", self.player1_id),
            });
        }
        Ok(())
    }
}

/// Durable record of one match together with the delta applied when it was committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub outcome: MatchOutcome,
    /// Authoritative value used to reverse this match later
    pub applied_delta: RatingDelta,
    pub recorded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn new(id: MatchId, outcome: MatchOutcome, applied_delta: RatingDelta) -> Self {
        let now = current_timestamp();
        Self {
            id,
            outcome,
            applied_delta,
            recorded_at: now,
            updated_at: now,
        }
    }

    /// Copy of this record carrying a superseding outcome and delta
    pub fn revised(&self, outcome: MatchOutcome, applied_delta: RatingDelta) -> Self {
        Self {
            id: self.id,
            outcome,
            applied_delta,
            recorded_at: self.recorded_at,
            updated_at: current_timestamp(),
        }
    }
}

/// Running per-player match counters maintained alongside the rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchTally {
    pub matches_played: u64,
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub goals_scored: u64,
    pub goals_conceded: u64,
    pub points: u64,
}

impl MatchTally {
    /// Tally with one more match added
    pub fn recorded(&self, goals_for: u32, goals_against: u32) -> Self {
        let result = SideResult::from_goals(goals_for, goals_against);
        Self {
            matches_played: self.matches_played + 1,
            wins: self.wins + u64::from(result == SideResult::Win),
            losses: self.losses + u64::from(result == SideResult::Loss),
            draws: self.draws + u64::from(result == SideResult::Draw),
            goals_scored: self.goals_scored + u64::from(goals_for),
            goals_conceded: self.goals_conceded + u64::from(goals_against),
            points: self.points + result.points(),
        }
    }

    /// Tally with one previously recorded match removed, or `None` if it was never counted
    pub fn retracted(&self, goals_for: u32, goals_against: u32) -> Option<Self> {
        let result = SideResult::from_goals(goals_for, goals_against);
        Some(Self {
            matches_played: self.matches_played.checked_sub(1)?,
            wins: self.wins.checked_sub(u64::from(result == SideResult::Win))?,
            losses: self
                .losses
                .checked_sub(u64::from(result == SideResult::Loss))?,
            draws: self.draws.checked_sub(u64::from(result == SideResult::Draw))?,
            goals_scored: self.goals_scored.checked_sub(u64::from(goals_for))?,
            goals_conceded: self.goals_conceded.checked_sub(u64::from(goals_against))?,
            points: self.points.checked_sub(result.points())?,
        })
    }

    pub fn goal_difference(&self) -> i64 {
        self.goals_scored as i64 - self.goals_conceded as i64
    }
}

/// Rating change information for a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub player_id: PlayerId,
    pub old_rating: Rating,
    pub new_rating: Rating,
    pub delta: i64,
}

/// Result of a create or edit: the stored record and both players' rating moves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReceipt {
    pub record: MatchRecord,
    /// Empty when the edit was a no-op
    pub rating_changes: Vec<RatingChange>,
}

/// Result of a delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionReceipt {
    pub match_id: MatchId,
    pub reverted_delta: RatingDelta,
    pub rating_changes: Vec<RatingChange>,
}
