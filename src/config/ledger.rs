//! Ledger transaction configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied to every ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Upper bound on any single rating store call
    pub store_timeout_ms: u64,
    /// Re-read and recompute attempts after a lost optimistic commit
    pub max_conflict_retries: u32,
    /// Largest accepted net change of a delta pair, in rating points
    pub zero_sum_tolerance: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: 2000,
            max_conflict_retries: 3,
            zero_sum_tolerance: 1,
        }
    }
}

impl LedgerConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
