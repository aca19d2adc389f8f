//! Error types for the rating ledger
//!
//! Every ledger, store and service operation surfaces one of these typed
//! failures. Configuration loading and the binary use anyhow on top.

use crate::types::{MatchId, PlayerId};

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Typed failures surfaced by the ledger and its collaborators
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: PlayerId },

    #[error("Player already exists: {player_id}")]
    PlayerAlreadyExists { player_id: PlayerId },

    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: MatchId },

    #[error("Invalid score: {reason}")]
    InvalidScore { reason: String },

    #[error("Invalid match: {reason}")]
    InvalidMatch { reason: String },

    #[error("Rating storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    #[error("Concurrent update conflict on player {player_id}")]
    ConcurrentConflict { player_id: PlayerId },

    #[error("Inconsistent stored delta ({player1:+}, {player2:+}): {reason}")]
    InconsistentStoredDelta {
        player1: i64,
        player2: i64,
        reason: String,
    },

    #[error("Inconsistent tally for player {player_id}: {reason}")]
    InconsistentTally { player_id: PlayerId, reason: String },

    /// A store write failed and undoing the committed rating change failed too
    #[error("Ratings and match records disagree: {cause}; compensation failed: {compensation}")]
    InconsistentState { cause: String, compensation: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal ledger error: {message}")]
    InternalError { message: String },
}

impl LedgerError {
    /// Whether the whole operation can be safely retried.
    ///
    /// Only store-side failures qualify; nothing was committed when they
    /// surface, so repeating the request from scratch is sound. A failed
    /// compensation is reported as `InconsistentState` instead.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::StorageUnavailable { .. } | LedgerError::ConcurrentConflict { .. }
        )
    }

    /// Whether this failure indicates corrupted stored data
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            LedgerError::InconsistentStoredDelta { .. }
                | LedgerError::InconsistentTally { .. }
                | LedgerError::InconsistentState { .. }
        )
    }

    /// Short label used for metrics and log lines
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::PlayerNotFound { .. } => "player_not_found",
            LedgerError::PlayerAlreadyExists { .. } => "player_already_exists",
            LedgerError::MatchNotFound { .. } => "match_not_found",
            LedgerError::InvalidScore { .. } => "invalid_score",
            LedgerError::InvalidMatch { .. } => "invalid_match",
            LedgerError::StorageUnavailable { .. } => "storage_unavailable",
            LedgerError::ConcurrentConflict { .. } => "concurrent_conflict",
            LedgerError::InconsistentStoredDelta { .. } => "inconsistent_stored_delta",
            LedgerError::InconsistentTally { .. } => "inconsistent_tally",
            LedgerError::InconsistentState { .. } => "inconsistent_state",
            LedgerError::ConfigurationError { .. } => "configuration_error",
            LedgerError::InternalError { .. } => "internal_error",
        }
    }
}
