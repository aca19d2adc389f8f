//! Match lifecycle service
//!
//! This module contains `MatchService`, the API surface that ties the match
//! store to the rating ledger. Each lifecycle operation runs on its own tokio
//! task so that a caller giving up cannot interrupt a transaction halfway.
//! If the match store fails after the ledger committed, a compensating ledger
//! transaction puts the ratings back.

use crate::config::AppConfig;
use crate::error::{LedgerError, Result};
use crate::ledger::{AppliedOutcome, LedgerTransaction, LockTable, RatingLedger};
use crate::matches::{InMemoryMatchStore, MatchStore};
use crate::metrics::MetricsCollector;
use crate::rating::elo::EloRatingCalculator;
use crate::rating::storage::{InMemoryRatingStore, RatingEntry, RatingStore};
use crate::types::{
    DeletionReceipt, MatchId, MatchOutcome, MatchReceipt, MatchRecord, MatchScore, PlayerId,
    RatingDelta,
};
use crate::utils::{generate_match_id, with_store_timeout};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// API entry point for recording, editing and deleting matches
#[derive(Clone)]
pub struct MatchService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    ledger: RatingLedger,
    matches: Arc<dyn MatchStore>,
    /// Serialises lifecycle operations on the same match
    match_locks: LockTable<MatchId>,
}

impl MatchService {
    pub fn new(ledger: RatingLedger, matches: Arc<dyn MatchStore>) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                ledger,
                matches,
                match_locks: LockTable::new(),
            }),
        }
    }

    /// Build a service over in-memory stores from configuration
    pub fn in_memory(config: &AppConfig) -> anyhow::Result<Self> {
        let calculator = EloRatingCalculator::new(config.rating.to_elo_config())?;
        let metrics = Arc::new(MetricsCollector::new()?);
        let ratings: Arc<dyn RatingStore> = Arc::new(InMemoryRatingStore::new());

        let ledger = RatingLedger::new(
            ratings,
            Arc::new(calculator),
            config.ledger.clone(),
            metrics,
        );

        info!(
            "Match service ready (K={}, starting rating {}, rounding {})",
            config.rating.k_factor, config.rating.starting_rating, config.rating.rounding
        );

        Ok(Self::new(ledger, Arc::new(InMemoryMatchStore::new())))
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        self.inner.ledger.metrics()
    }

    /// Create a player at the starting rating
    pub async fn register_player(&self, player_id: impl Into<PlayerId>) -> Result<RatingEntry> {
        let player_id = player_id.into();
        let inner = self.inner.clone();
        run_detached("register_player", async move {
            inner.ledger.register_player(&player_id).await
        })
        .await
    }

    pub async fn player(&self, player_id: &PlayerId) -> Result<RatingEntry> {
        self.inner.ledger.player(player_id).await
    }

    /// All players, highest rating first
    pub async fn standings(&self) -> Result<Vec<RatingEntry>> {
        let mut players = self.inner.ledger.all_players().await?;
        players.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        Ok(players)
    }

    pub async fn match_record(&self, match_id: MatchId) -> Result<MatchRecord> {
        self.inner
            .bounded("get", self.inner.matches.get(match_id))
            .await
    }

    pub async fn matches(&self) -> Result<Vec<MatchRecord>> {
        self.inner.bounded("all", self.inner.matches.all()).await
    }

    /// Record a new match and apply its rating effect
    pub async fn record_match(
        &self,
        player1_id: impl Into<PlayerId>,
        player2_id: impl Into<PlayerId>,
        player1_goals: i64,
        player2_goals: i64,
    ) -> Result<MatchReceipt> {
        let score = MatchScore::try_from_goals(player1_goals, player2_goals)?;
        let outcome = MatchOutcome::new(player1_id, player2_id, score);
        outcome.validate()?;

        let inner = self.inner.clone();
        run_detached("record_match", async move { inner.record(outcome).await }).await
    }

    /// Change the score of a recorded match
    pub async fn edit_match(
        &self,
        match_id: MatchId,
        player1_goals: i64,
        player2_goals: i64,
    ) -> Result<MatchReceipt> {
        let score = MatchScore::try_from_goals(player1_goals, player2_goals)?;

        let inner = self.inner.clone();
        run_detached("edit_match", async move { inner.edit(match_id, score).await }).await
    }

    /// Delete a recorded match and remove its rating effect
    pub async fn delete_match(&self, match_id: MatchId) -> Result<DeletionReceipt> {
        let inner = self.inner.clone();
        run_detached("delete_match", async move { inner.delete(match_id).await }).await
    }
}

impl ServiceInner {
    async fn record(&self, outcome: MatchOutcome) -> Result<MatchReceipt> {
        let receipt = self.ledger.apply(outcome.clone()).await?;
        let delta = applied(receipt.applied_delta)?;

        let record = MatchRecord::new(generate_match_id(), outcome.clone(), delta);
        if let Err(e) = self
            .bounded("insert", self.matches.insert(record.clone()))
            .await
        {
            warn!("Storing match for {} vs {} failed: {}", outcome.player1_id, outcome.player2_id, e);
            let undo = LedgerTransaction::revert(outcome, delta)?;
            self.compensate("record", undo, &e).await?;
            return Err(e);
        }

        info!(
            "Recorded match {}: {} {} {} (delta {})",
            record.id, record.outcome.player1_id, record.outcome.score, record.outcome.player2_id, delta
        );

        Ok(MatchReceipt {
            record,
            rating_changes: receipt.rating_changes,
        })
    }

    async fn edit(&self, match_id: MatchId, score: MatchScore) -> Result<MatchReceipt> {
        let _guard = self.match_locks.lock_all(&[match_id]).await?;

        let existing = self.bounded("get", self.matches.get(match_id)).await?;
        if existing.outcome.score == score {
            info!("Edit of match {} keeps score {}, nothing to do", match_id, score);
            return Ok(MatchReceipt {
                record: existing,
                rating_changes: Vec::new(),
            });
        }

        let new_outcome = existing.outcome.with_score(score);
        let receipt = self
            .ledger
            .replace(
                existing.outcome.clone(),
                existing.applied_delta,
                new_outcome.clone(),
            )
            .await?;
        let delta = applied(receipt.applied_delta)?;

        let revised = existing.revised(new_outcome.clone(), delta);
        if let Err(e) = self
            .bounded("update", self.matches.update(revised.clone()))
            .await
        {
            warn!("Updating match {} failed: {}", match_id, e);
            let undo = LedgerTransaction::restore(
                Some(AppliedOutcome::new(new_outcome, delta)),
                AppliedOutcome::new(existing.outcome, existing.applied_delta),
            )?;
            self.compensate("edit", undo, &e).await?;
            return Err(e);
        }

        info!(
            "Edited match {}: {} -> {} (delta {} -> {})",
            match_id, existing.outcome.score, score, existing.applied_delta, delta
        );

        Ok(MatchReceipt {
            record: revised,
            rating_changes: receipt.rating_changes,
        })
    }

    async fn delete(&self, match_id: MatchId) -> Result<DeletionReceipt> {
        let _guard = self.match_locks.lock_all(&[match_id]).await?;

        let existing = self.bounded("get", self.matches.get(match_id)).await?;
        let receipt = self
            .ledger
            .revert(existing.outcome.clone(), existing.applied_delta)
            .await?;

        if let Err(e) = self.bounded("delete", self.matches.delete(match_id)).await {
            warn!("Deleting match {} failed: {}", match_id, e);
            let undo = LedgerTransaction::restore(
                None,
                AppliedOutcome::new(existing.outcome, existing.applied_delta),
            )?;
            self.compensate("delete", undo, &e).await?;
            return Err(e);
        }

        info!(
            "Deleted match {} and reverted delta {}",
            match_id, existing.applied_delta
        );

        Ok(DeletionReceipt {
            match_id,
            reverted_delta: existing.applied_delta,
            rating_changes: receipt.rating_changes,
        })
    }

    /// Undo a committed ledger transaction after the match store refused the record.
    ///
    /// If the undo does not commit either, the rating change stays applied
    /// and `cause` is no longer safe to retry, so the failure is reported as
    /// `InconsistentState`.
    async fn compensate(
        &self,
        operation: &str,
        undo: LedgerTransaction,
        cause: &LedgerError,
    ) -> Result<()> {
        let metrics = self.ledger.metrics();

        match self.ledger.execute(undo).await {
            Ok(_) => {
                info!("Compensated failed {} on the rating ledger", operation);
                metrics.record_compensation(operation, true);
                Ok(())
            }
            Err(e) => {
                error!(
                    "Compensation for failed {} did not commit, ratings and match records disagree: {}",
                    operation, e
                );
                metrics.record_compensation(operation, false);
                Err(LedgerError::InconsistentState {
                    cause: cause.to_string(),
                    compensation: e.to_string(),
                })
            }
        }
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_store_timeout(self.ledger.config().store_timeout(), operation, call).await
    }
}

fn applied(delta: Option<RatingDelta>) -> Result<RatingDelta> {
    delta.ok_or_else(|| LedgerError::InternalError {
        message: "ledger transaction applied no delta".to_string(),
    })
}

/// Run an operation on its own task so dropping the caller does not cancel it
async fn run_detached<T, F>(operation: &'static str, task: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| LedgerError::InternalError {
            message: format!("{} task failed: {}", operation, e),
        })?
}
