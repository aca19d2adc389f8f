//! Test fixtures and failure-injecting stores for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use rivalry_ledger::config::{LedgerConfig, RatingConfig};
use rivalry_ledger::error::{LedgerError, Result};
use rivalry_ledger::ledger::RatingLedger;
use rivalry_ledger::matches::{InMemoryMatchStore, MatchStore};
use rivalry_ledger::metrics::MetricsCollector;
use rivalry_ledger::rating::{
    EloRatingCalculator, InMemoryRatingStore, RatingEntry, RatingStore, RatingUpdate,
};
use rivalry_ledger::service::MatchService;
use rivalry_ledger::types::{MatchId, MatchRecord, PlayerId, Rating};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn offline(what: &str) -> LedgerError {
    LedgerError::StorageUnavailable {
        reason: format!("{} offline", what),
    }
}

/// Rating store whose commits can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyRatingStore {
    inner: InMemoryRatingStore,
    fail_commits: AtomicBool,
    commit_attempts: AtomicUsize,
    /// Attempt count from which commits fail, if set
    fail_from_attempt: Mutex<Option<usize>>,
}

impl FlakyRatingStore {
    pub fn with_players(players: &[(&str, Rating)]) -> Self {
        Self {
            inner: InMemoryRatingStore::with_players(
                players.iter().map(|(id, rating)| (id.to_string(), *rating)),
            ),
            ..Self::default()
        }
    }

    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Let the next `successes` commits through and fail every one after
    pub fn fail_commits_after(&self, successes: usize) {
        let from = self.commit_attempts() + successes;
        *self.fail_from_attempt.lock().unwrap() = Some(from);
    }

    pub fn commit_attempts(&self) -> usize {
        self.commit_attempts.load(Ordering::SeqCst)
    }

    fn should_fail(&self, attempt: usize) -> bool {
        let limited = matches!(*self.fail_from_attempt.lock().unwrap(), Some(from) if attempt >= from);
        limited || self.fail_commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RatingStore for FlakyRatingStore {
    async fn get_rating(&self, player_id: &PlayerId) -> Result<RatingEntry> {
        self.inner.get_rating(player_id).await
    }

    async fn set_rating(&self, player_id: &PlayerId, new_rating: Rating) -> Result<RatingEntry> {
        self.inner.set_rating(player_id, new_rating).await
    }

    async fn commit(&self, updates: Vec<RatingUpdate>) -> Result<Vec<RatingEntry>> {
        let attempt = self.commit_attempts.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(attempt) {
            return Err(offline("rating store"));
        }
        self.inner.commit(updates).await
    }

    async fn player_exists(&self, player_id: &PlayerId) -> Result<bool> {
        self.inner.player_exists(player_id).await
    }

    async fn create_player(&self, player_id: &PlayerId, initial_rating: Rating) -> Result<RatingEntry> {
        self.inner.create_player(player_id, initial_rating).await
    }

    async fn all_ratings(&self) -> Result<Vec<RatingEntry>> {
        self.inner.all_ratings().await
    }
}

/// Rating store that sleeps before every commit
#[derive(Debug)]
pub struct SlowRatingStore {
    inner: InMemoryRatingStore,
    commit_delay: Duration,
}

impl SlowRatingStore {
    pub fn with_players(players: &[(&str, Rating)], commit_delay: Duration) -> Self {
        Self {
            inner: InMemoryRatingStore::with_players(
                players.iter().map(|(id, rating)| (id.to_string(), *rating)),
            ),
            commit_delay,
        }
    }
}

#[async_trait]
impl RatingStore for SlowRatingStore {
    async fn get_rating(&self, player_id: &PlayerId) -> Result<RatingEntry> {
        self.inner.get_rating(player_id).await
    }

    async fn set_rating(&self, player_id: &PlayerId, new_rating: Rating) -> Result<RatingEntry> {
        self.inner.set_rating(player_id, new_rating).await
    }

    async fn commit(&self, updates: Vec<RatingUpdate>) -> Result<Vec<RatingEntry>> {
        tokio::time::sleep(self.commit_delay).await;
        self.inner.commit(updates).await
    }

    async fn player_exists(&self, player_id: &PlayerId) -> Result<bool> {
        self.inner.player_exists(player_id).await
    }

    async fn create_player(&self, player_id: &PlayerId, initial_rating: Rating) -> Result<RatingEntry> {
        self.inner.create_player(player_id, initial_rating).await
    }

    async fn all_ratings(&self) -> Result<Vec<RatingEntry>> {
        self.inner.all_ratings().await
    }
}

/// Match store whose writes can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyMatchStore {
    inner: InMemoryMatchStore,
    fail_writes: AtomicBool,
}

impl FlakyMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(offline("match store"));
        }
        Ok(())
    }
}

#[async_trait]
impl MatchStore for FlakyMatchStore {
    async fn insert(&self, record: MatchRecord) -> Result<()> {
        self.check()?;
        self.inner.insert(record).await
    }

    async fn get(&self, match_id: MatchId) -> Result<MatchRecord> {
        self.inner.get(match_id).await
    }

    async fn update(&self, record: MatchRecord) -> Result<()> {
        self.check()?;
        self.inner.update(record).await
    }

    async fn delete(&self, match_id: MatchId) -> Result<MatchRecord> {
        self.check()?;
        self.inner.delete(match_id).await
    }

    async fn all(&self) -> Result<Vec<MatchRecord>> {
        self.inner.all().await
    }
}

/// Service over the given stores with default Elo settings
pub fn service_with(
    ratings: Arc<dyn RatingStore>,
    matches: Arc<dyn MatchStore>,
    ledger_config: LedgerConfig,
) -> MatchService {
    let calculator = EloRatingCalculator::new(RatingConfig::default().to_elo_config())
        .expect("default rating config is valid");
    let metrics = Arc::new(MetricsCollector::new().expect("Failed to create metrics collector"));

    MatchService::new(
        RatingLedger::new(ratings, Arc::new(calculator), ledger_config, metrics),
        matches,
    )
}

/// In-memory service with players already at the given ratings
pub fn seeded_service(players: &[(&str, Rating)]) -> (MatchService, Arc<InMemoryRatingStore>) {
    let ratings = Arc::new(InMemoryRatingStore::with_players(
        players.iter().map(|(id, rating)| (id.to_string(), *rating)),
    ));
    let service = service_with(
        ratings.clone(),
        Arc::new(InMemoryMatchStore::new()),
        LedgerConfig::default(),
    );
    (service, ratings)
}

pub async fn rating_of(store: &dyn RatingStore, player_id: &str) -> Rating {
    store
        .get_rating(&player_id.to_string())
        .await
        .expect("player should exist")
        .rating
}
