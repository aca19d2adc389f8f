//! Rating storage interface and implementations
//!
//! The store is the sole authority for current rating values. Every entry
//! carries a version so batched commits can detect lost updates.

use crate::error::{LedgerError, Result};
use crate::types::{MatchTally, PlayerId, Rating};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Storage entry for a player's rating with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub player_id: PlayerId,
    pub rating: Rating,
    pub tally: MatchTally,
    /// Incremented on every write
    pub version: u64,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RatingEntry {
    /// Create a new rating entry for a new player
    pub fn new(player_id: PlayerId, initial_rating: Rating) -> Self {
        let now = current_timestamp();
        Self {
            player_id,
            rating: initial_rating,
            tally: MatchTally::default(),
            version: 0,
            last_updated: now,
            created_at: now,
        }
    }

    fn apply(&mut self, rating: Rating, tally: MatchTally) {
        self.rating = rating;
        self.tally = tally;
        self.version += 1;
        self.last_updated = current_timestamp();
    }
}

/// One side of an atomic commit: the new values plus the version they were computed from
#[derive(Debug, Clone, PartialEq)]
pub struct RatingUpdate {
    pub player_id: PlayerId,
    pub expected_version: u64,
    pub rating: Rating,
    pub tally: MatchTally,
}

/// Trait for rating storage operations
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Get a player's current entry, failing with `PlayerNotFound` if absent
    async fn get_rating(&self, player_id: &PlayerId) -> Result<RatingEntry>;

    /// Overwrite a player's rating unconditionally
    async fn set_rating(&self, player_id: &PlayerId, new_rating: Rating) -> Result<RatingEntry>;

    /// Apply all updates or none.
    ///
    /// Fails with `ConcurrentConflict` if any entry's version moved since it was read.
    async fn commit(&self, updates: Vec<RatingUpdate>) -> Result<Vec<RatingEntry>>;

    async fn player_exists(&self, player_id: &PlayerId) -> Result<bool>;

    /// Register a new player, failing with `PlayerAlreadyExists` on duplicates
    async fn create_player(&self, player_id: &PlayerId, initial_rating: Rating)
        -> Result<RatingEntry>;

    /// Get all players with ratings
    async fn all_ratings(&self) -> Result<Vec<RatingEntry>>;
}

/// In-memory rating storage implementation
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    ratings: RwLock<HashMap<PlayerId, RatingEntry>>,
}

impl InMemoryRatingStore {
    /// Create a new in-memory rating storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with players at the given ratings
    pub fn with_players<I, S>(players: I) -> Self
    where
        I: IntoIterator<Item = (S, Rating)>,
        S: Into<PlayerId>,
    {
        let ratings = players
            .into_iter()
            .map(|(id, rating)| {
                let id = id.into();
                (id.clone(), RatingEntry::new(id, rating))
            })
            .collect();

        Self {
            ratings: RwLock::new(ratings),
        }
    }

    fn read_lock_error() -> LedgerError {
        LedgerError::InternalError {
            message: "Failed to acquire ratings read lock".to_string(),
        }
    }

    fn write_lock_error() -> LedgerError {
        LedgerError::InternalError {
            message: "Failed to acquire ratings write lock".to_string(),
        }
    }
}

#[async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn get_rating(&self, player_id: &PlayerId) -> Result<RatingEntry> {
        let ratings = self.ratings.read().map_err(|_| Self::read_lock_error())?;

        ratings
            .get(player_id)
            .cloned()
            .ok_or_else(|| LedgerError::PlayerNotFound {
                player_id: player_id.clone(),
            })
    }

    async fn set_rating(&self, player_id: &PlayerId, new_rating: Rating) -> Result<RatingEntry> {
        let mut ratings = self.ratings.write().map_err(|_| Self::write_lock_error())?;

        let entry = ratings
            .get_mut(player_id)
            .ok_or_else(|| LedgerError::PlayerNotFound {
                player_id: player_id.clone(),
            })?;
        let tally = entry.tally;
        entry.apply(new_rating, tally);

        Ok(entry.clone())
    }

    async fn commit(&self, updates: Vec<RatingUpdate>) -> Result<Vec<RatingEntry>> {
        let mut ratings = self.ratings.write().map_err(|_| Self::write_lock_error())?;

        // Check everything before touching anything
        for update in &updates {
            let entry =
                ratings
                    .get(&update.player_id)
                    .ok_or_else(|| LedgerError::PlayerNotFound {
                        player_id: update.player_id.clone(),
                    })?;
            if entry.version != update.expected_version {
                return Err(LedgerError::ConcurrentConflict {
                    player_id: update.player_id.clone(),
                });
            }
        }

        let mut committed = Vec::with_capacity(updates.len());
        for update in updates {
            if let Some(entry) = ratings.get_mut(&update.player_id) {
                entry.apply(update.rating, update.tally);
                committed.push(entry.clone());
            }
        }

        Ok(committed)
    }

    async fn player_exists(&self, player_id: &PlayerId) -> Result<bool> {
        let ratings = self.ratings.read().map_err(|_| Self::read_lock_error())?;

        Ok(ratings.contains_key(player_id))
    }

    async fn create_player(
        &self,
        player_id: &PlayerId,
        initial_rating: Rating,
    ) -> Result<RatingEntry> {
        let mut ratings = self.ratings.write().map_err(|_| Self::write_lock_error())?;

        if ratings.contains_key(player_id) {
            return Err(LedgerError::PlayerAlreadyExists {
                player_id: player_id.clone(),
            });
        }

        let entry = RatingEntry::new(player_id.clone(), initial_rating);
        ratings.insert(player_id.clone(), entry.clone());
        Ok(entry)
    }

    async fn all_ratings(&self) -> Result<Vec<RatingEntry>> {
        let ratings = self.ratings.read().map_err(|_| Self::read_lock_error())?;

        Ok(ratings.values().cloned().collect())
    }
}
