//! Rating ledger engine
//!
//! Executes ledger transactions against the rating store. Both players of a
//! transaction are locked for its whole duration, entries are read fresh,
//! and the new values are committed in one optimistic batch. A lost race is
//! retried from the read; any other failure leaves both ratings untouched.

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::ledger::locks::LockTable;
use crate::ledger::transaction::{LedgerTransaction, TransactionReceipt};
use crate::metrics::MetricsCollector;
use crate::rating::calculator::RatingCalculator;
use crate::rating::storage::{RatingEntry, RatingStore};
use crate::types::{MatchOutcome, PlayerId, RatingDelta};
use crate::utils::{format_change, with_store_timeout};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Sole writer of player ratings
pub struct RatingLedger {
    /// Authoritative rating values
    store: Arc<dyn RatingStore>,
    /// Delta formula
    calculator: Arc<dyn RatingCalculator>,
    /// Timeouts, retries and tolerance
    config: LedgerConfig,
    /// Metrics collector for recording transaction outcomes
    metrics: Arc<MetricsCollector>,
    /// Per-player exclusion
    locks: LockTable<PlayerId>,
}

impl RatingLedger {
    pub fn new(
        store: Arc<dyn RatingStore>,
        calculator: Arc<dyn RatingCalculator>,
        config: LedgerConfig,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            calculator,
            config,
            metrics,
            locks: LockTable::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Create a player at the calculator's initial rating
    pub async fn register_player(&self, player_id: &PlayerId) -> Result<RatingEntry> {
        if player_id.trim().is_empty() {
            return Err(LedgerError::InvalidMatch {
                reason: "player id must not be empty".to_string(),
            });
        }

        let initial = self.calculator.initial_rating();
        let entry = self
            .bounded("create_player", self.store.create_player(player_id, initial))
            .await?;

        info!("Registered player {} at rating {}", player_id, entry.rating);
        Ok(entry)
    }

    pub async fn player(&self, player_id: &PlayerId) -> Result<RatingEntry> {
        self.bounded("get_rating", self.store.get_rating(player_id))
            .await
    }

    pub async fn all_players(&self) -> Result<Vec<RatingEntry>> {
        self.bounded("all_ratings", self.store.all_ratings()).await
    }

    /// Apply a new match's delta to both players
    pub async fn apply(&self, outcome: MatchOutcome) -> Result<TransactionReceipt> {
        self.execute(LedgerTransaction::apply(outcome)?).await
    }

    /// Remove exactly the stored delta of a match from both players
    pub async fn revert(
        &self,
        outcome: MatchOutcome,
        stored_delta: RatingDelta,
    ) -> Result<TransactionReceipt> {
        self.execute(LedgerTransaction::revert(outcome, stored_delta)?)
            .await
    }

    /// Revert the stored delta and apply the new outcome as one commit
    pub async fn replace(
        &self,
        old_outcome: MatchOutcome,
        stored_delta: RatingDelta,
        new_outcome: MatchOutcome,
    ) -> Result<TransactionReceipt> {
        self.execute(LedgerTransaction::replace(
            old_outcome,
            stored_delta,
            new_outcome,
        )?)
        .await
    }

    /// Run a transaction to completion or to a failure with no partial writes
    pub async fn execute(&self, transaction: LedgerTransaction) -> Result<TransactionReceipt> {
        let timer = self.metrics.start_timer();
        let operation = transaction.kind().as_str();

        let result = self.run(&transaction).await;

        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        self.metrics
            .record_transaction(operation, status, timer.stop());

        result
    }

    async fn run(&self, transaction: &LedgerTransaction) -> Result<TransactionReceipt> {
        let tolerance = self.config.zero_sum_tolerance;
        let (player1, player2) = transaction.participants();

        if let Err(e) = transaction.validate_stored(tolerance) {
            error!(
                "Refusing {} for {} vs {}: {}",
                transaction.kind(),
                player1,
                player2,
                e
            );
            self.metrics.record_integrity_fault();
            return Err(e);
        }

        let _locks = self
            .locks
            .lock_all(&[player1.clone(), player2.clone()])
            .await?;

        let mut retries = 0;
        loop {
            let entry1 = self
                .bounded("get_rating", self.store.get_rating(player1))
                .await?;
            let entry2 = self
                .bounded("get_rating", self.store.get_rating(player2))
                .await?;

            let plan = transaction
                .plan(&entry1, &entry2, self.calculator.as_ref(), tolerance)
                .map_err(|e| {
                    if e.is_integrity_fault() {
                        error!(
                            "Integrity fault during {} for {} vs {}: {}",
                            transaction.kind(),
                            player1,
                            player2,
                            e
                        );
                        self.metrics.record_integrity_fault();
                    }
                    e
                })?;

            match self
                .bounded("commit", self.store.commit(plan.updates.clone()))
                .await
            {
                Ok(_) => {
                    let changes = &plan.receipt.rating_changes;
                    info!(
                        "Committed {}: {} {}, {} {}",
                        transaction.kind(),
                        player1,
                        format_change(changes[0].old_rating, changes[0].new_rating),
                        player2,
                        format_change(changes[1].old_rating, changes[1].new_rating)
                    );
                    return Ok(plan.receipt);
                }
                Err(LedgerError::ConcurrentConflict { player_id })
                    if retries < self.config.max_conflict_retries =>
                {
                    retries += 1;
                    self.metrics.record_conflict_retry();
                    warn!(
                        "Rating of {} changed during {}, retrying ({}/{})",
                        player_id,
                        transaction.kind(),
                        retries,
                        self.config.max_conflict_retries
                    );
                }
                Err(e) => {
                    debug!("{} for {} vs {} failed: {}", transaction.kind(), player1, player2, e);
                    return Err(e);
                }
            }
        }
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_store_timeout(self.config.store_timeout(), operation, call).await
    }
}
