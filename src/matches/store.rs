//! Match record storage interface and implementations

use crate::error::{LedgerError, Result};
use crate::types::{MatchId, MatchRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for durable match record storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Store a new record, failing if the id is already taken
    async fn insert(&self, record: MatchRecord) -> Result<()>;

    /// Get a record, failing with `MatchNotFound` if absent
    async fn get(&self, match_id: MatchId) -> Result<MatchRecord>;

    /// Overwrite an existing record
    async fn update(&self, record: MatchRecord) -> Result<()>;

    /// Remove a record and return it
    async fn delete(&self, match_id: MatchId) -> Result<MatchRecord>;

    /// All records, oldest first
    async fn all(&self) -> Result<Vec<MatchRecord>>;
}

/// In-memory match storage implementation
#[derive(Debug, Default)]
pub struct InMemoryMatchStore {
    records: RwLock<HashMap<MatchId, MatchRecord>>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error() -> LedgerError {
        LedgerError::InternalError {
            message: "Failed to acquire match records lock".to_string(),
        }
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn insert(&self, record: MatchRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Self::lock_error())?;

        if records.contains_key(&record.id) {
            return Err(LedgerError::InvalidMatch {
                reason: format!("match {} is already recorded", record.id),
            });
        }

        records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, match_id: MatchId) -> Result<MatchRecord> {
        let records = self.records.read().map_err(|_| Self::lock_error())?;

        records
            .get(&match_id)
            .cloned()
            .ok_or(LedgerError::MatchNotFound { match_id })
    }

    async fn update(&self, record: MatchRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Self::lock_error())?;

        match records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(LedgerError::MatchNotFound {
                match_id: record.id,
            }),
        }
    }

    async fn delete(&self, match_id: MatchId) -> Result<MatchRecord> {
        let mut records = self.records.write().map_err(|_| Self::lock_error())?;

        records
            .remove(&match_id)
            .ok_or(LedgerError::MatchNotFound { match_id })
    }

    async fn all(&self) -> Result<Vec<MatchRecord>> {
        let records = self.records.read().map_err(|_| Self::lock_error())?;

        let mut all: Vec<MatchRecord> = records.values().cloned().collect();
        all.sort_by_key(|record| record.recorded_at);
        Ok(all)
    }
}
