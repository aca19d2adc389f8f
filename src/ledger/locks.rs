//! Keyed async mutual exclusion
//!
//! Keys are always locked in ascending order, so two callers asking for the
//! same pair in opposite roles cannot deadlock.

use crate::error::{LedgerError, Result};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Idle slots are swept once the table grows past this size
const PRUNE_THRESHOLD: usize = 1024;

/// Table of per-key locks, created on demand
#[derive(Debug)]
pub struct LockTable<K> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

/// Guards for every key in a `lock_all` call; released on drop
#[derive(Debug)]
pub struct LockSet<K> {
    keys: Vec<K>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl<K> LockSet<K> {
    /// Locked keys in acquisition order
    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}

impl<K> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> LockTable<K>
where
    K: Clone + Ord + Hash + Eq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every distinct key, waiting as long as needed
    pub async fn lock_all(&self, keys: &[K]) -> Result<LockSet<K>> {
        let mut ordered = keys.to_vec();
        ordered.sort();
        ordered.dedup();

        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| LedgerError::InternalError {
                    message: "Failed to acquire lock table".to_string(),
                })?;

            if slots.len() > PRUNE_THRESHOLD {
                // Only the table holds a reference: nobody is waiting or holding it
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }

            ordered
                .iter()
                .map(|key| slots.entry(key.clone()).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }

        Ok(LockSet {
            keys: ordered,
            _guards: guards,
        })
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
