//! Ledger transactions
//!
//! A transaction binds an optional previously applied outcome (to be removed)
//! and an optional new outcome (to be added) for one pair of players. It is
//! planned against freshly read entries and committed as a single unit, so no
//! caller can observe the reverted-only state of an edit.

use crate::error::{LedgerError, Result};
use crate::rating::calculator::RatingCalculator;
use crate::rating::storage::{RatingEntry, RatingUpdate};
use crate::types::{MatchOutcome, MatchTally, PlayerId, Rating, RatingChange, RatingDelta};
use serde::{Deserialize, Serialize};

/// Which lifecycle step a transaction performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// New match: compute and add a delta
    Apply,
    /// Match deleted: remove the stored delta
    Revert,
    /// Match edited: remove the stored delta, then compute and add a new one
    Replace,
    /// Put back a known delta after a failed follow-up step
    Restore,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Apply => "apply",
            TransactionKind::Revert => "revert",
            TransactionKind::Replace => "replace",
            TransactionKind::Restore => "restore",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outcome together with the delta that was committed for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedOutcome {
    pub outcome: MatchOutcome,
    pub delta: RatingDelta,
}

impl AppliedOutcome {
    pub fn new(outcome: MatchOutcome, delta: RatingDelta) -> Self {
        Self { outcome, delta }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PendingOutcome {
    /// Delta is computed from the ratings current at commit time
    Compute(MatchOutcome),
    /// Delta is already known and added verbatim
    Known(AppliedOutcome),
}

/// What a committed transaction did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub kind: TransactionKind,
    /// Delta removed from the players, if any
    pub reverted_delta: Option<RatingDelta>,
    /// Delta added to the players, if any; this is what the match record must store
    pub applied_delta: Option<RatingDelta>,
    /// Player 1's change first, then player 2's
    pub rating_changes: Vec<RatingChange>,
}

/// Planned writes for one attempt, computed without touching the store
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TransactionPlan {
    pub updates: Vec<RatingUpdate>,
    pub receipt: TransactionReceipt,
}

/// Ephemeral unit of work applying, reverting or replacing one match's rating effect
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTransaction {
    kind: TransactionKind,
    participants: (PlayerId, PlayerId),
    previous: Option<AppliedOutcome>,
    next: Option<PendingOutcome>,
}

impl LedgerTransaction {
    /// Transaction for a brand-new match
    pub fn apply(outcome: MatchOutcome) -> Result<Self> {
        outcome.validate()?;

        Ok(Self {
            kind: TransactionKind::Apply,
            participants: pair(&outcome),
            previous: None,
            next: Some(PendingOutcome::Compute(outcome)),
        })
    }

    /// Transaction removing exactly the stored contribution of a match
    pub fn revert(outcome: MatchOutcome, stored_delta: RatingDelta) -> Result<Self> {
        outcome.validate()?;

        Ok(Self {
            kind: TransactionKind::Revert,
            participants: pair(&outcome),
            previous: Some(AppliedOutcome::new(outcome, stored_delta)),
            next: None,
        })
    }

    /// Transaction for an edit: revert the stored delta and apply the new outcome
    pub fn replace(
        old_outcome: MatchOutcome,
        stored_delta: RatingDelta,
        new_outcome: MatchOutcome,
    ) -> Result<Self> {
        old_outcome.validate()?;
        new_outcome.validate()?;

        if !old_outcome.same_participants(&new_outcome) {
            return Err(LedgerError::InvalidMatch {
                reason: format!(
                    "an edit cannot change participants ({} vs {} -> {} vs {})",
                    old_outcome.player1_id,
                    old_outcome.player2_id,
                    new_outcome.player1_id,
                    new_outcome.player2_id
                ),
            });
        }

        Ok(Self {
            kind: TransactionKind::Replace,
            participants: pair(&new_outcome),
            previous: Some(AppliedOutcome::new(old_outcome, stored_delta)),
            next: Some(PendingOutcome::Compute(new_outcome)),
        })
    }

    /// Undo transaction: optionally remove `remove`, then add `reinstate` verbatim
    pub(crate) fn restore(
        remove: Option<AppliedOutcome>,
        reinstate: AppliedOutcome,
    ) -> Result<Self> {
        reinstate.outcome.validate()?;
        if let Some(remove) = &remove {
            if !remove.outcome.same_participants(&reinstate.outcome) {
                return Err(LedgerError::InvalidMatch {
                    reason: "restore must involve the same participants".to_string(),
                });
            }
        }

        Ok(Self {
            kind: TransactionKind::Restore,
            participants: pair(&reinstate.outcome),
            previous: remove,
            next: Some(PendingOutcome::Known(reinstate)),
        })
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// The pair of players this transaction touches, in seat order
    pub fn participants(&self) -> (&PlayerId, &PlayerId) {
        (&self.participants.0, &self.participants.1)
    }

    /// Reject stored deltas that cannot have come from a committed transaction
    pub fn validate_stored(&self, tolerance: i64) -> Result<()> {
        if let Some(previous) = &self.previous {
            previous.delta.validate(tolerance)?;
        }
        if let Some(PendingOutcome::Known(known)) = &self.next {
            known.delta.validate(tolerance)?;
        }
        Ok(())
    }

    /// Compute the new entries for both players from their current entries
    pub(crate) fn plan(
        &self,
        player1: &RatingEntry,
        player2: &RatingEntry,
        calculator: &dyn RatingCalculator,
        tolerance: i64,
    ) -> Result<TransactionPlan> {
        let mut rating1 = player1.rating;
        let mut rating2 = player2.rating;
        let mut tally1 = player1.tally;
        let mut tally2 = player2.tally;

        let reverted_delta = match &self.previous {
            Some(previous) => {
                let score = previous.outcome.score;
                let removal = previous.delta.negated();
                rating1 = shift(rating1, removal.player1, &player1.player_id)?;
                rating2 = shift(rating2, removal.player2, &player2.player_id)?;
                tally1 = retract(
                    &tally1,
                    score.player1_goals,
                    score.player2_goals,
                    &player1.player_id,
                )?;
                tally2 = retract(
                    &tally2,
                    score.player2_goals,
                    score.player1_goals,
                    &player2.player_id,
                )?;
                Some(previous.delta)
            }
            None => None,
        };

        let applied_delta = match &self.next {
            Some(next) => {
                let (score, delta) = match next {
                    PendingOutcome::Compute(outcome) => {
                        // Computed from the ratings with the old contribution already removed
                        let delta =
                            calculator.calculate_delta(rating1, rating2, outcome.outcome());
                        delta.validate(tolerance).map_err(|e| LedgerError::InternalError {
                            message: format!("rating formula produced an unusable delta: {}", e),
                        })?;
                        (outcome.score, delta)
                    }
                    PendingOutcome::Known(applied) => (applied.outcome.score, applied.delta),
                };

                rating1 = shift(rating1, delta.player1, &player1.player_id)?;
                rating2 = shift(rating2, delta.player2, &player2.player_id)?;
                tally1 = tally1.recorded(score.player1_goals, score.player2_goals);
                tally2 = tally2.recorded(score.player2_goals, score.player1_goals);
                Some(delta)
            }
            None => None,
        };

        let updates = vec![
            RatingUpdate {
                player_id: player1.player_id.clone(),
                expected_version: player1.version,
                rating: rating1,
                tally: tally1,
            },
            RatingUpdate {
                player_id: player2.player_id.clone(),
                expected_version: player2.version,
                rating: rating2,
                tally: tally2,
            },
        ];

        let rating_changes = vec![
            RatingChange {
                player_id: player1.player_id.clone(),
                old_rating: player1.rating,
                new_rating: rating1,
                delta: rating1 - player1.rating,
            },
            RatingChange {
                player_id: player2.player_id.clone(),
                old_rating: player2.rating,
                new_rating: rating2,
                delta: rating2 - player2.rating,
            },
        ];

        Ok(TransactionPlan {
            updates,
            receipt: TransactionReceipt {
                kind: self.kind,
                reverted_delta,
                applied_delta,
                rating_changes,
            },
        })
    }
}

fn pair(outcome: &MatchOutcome) -> (PlayerId, PlayerId) {
    (outcome.player1_id.clone(), outcome.player2_id.clone())
}

fn shift(rating: Rating, by: i64, player_id: &PlayerId) -> Result<Rating> {
    rating
        .checked_add(by)
        .ok_or_else(|| LedgerError::InternalError {
            message: format!("rating overflow for player {}", player_id),
        })
}

fn retract(
    tally: &MatchTally,
    goals_for: u32,
    goals_against: u32,
    player_id: &PlayerId,
) -> Result<MatchTally> {
    tally
        .retracted(goals_for, goals_against)
        .ok_or_else(|| LedgerError::InconsistentTally {
            player_id: player_id.clone(),
            reason: format!(
                "cannot remove a {}-{} result that was never counted",
                goals_for, goals_against
            ),
        })
}
