//! Utility functions for the rating ledger

use crate::error::{LedgerError, Result};
use crate::types::{MatchId, Rating};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Generate a new unique match ID
pub fn generate_match_id() -> MatchId {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Signed rating change formatted the way it is logged and printed
pub fn format_change(old_rating: Rating, new_rating: Rating) -> String {
    format!("{} -> {} ({:+})", old_rating, new_rating, new_rating - old_rating)
}

/// Await a storage call, mapping an elapsed deadline to `StorageUnavailable`
pub async fn with_store_timeout<T, F>(limit: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Store call {} exceeded {}ms", operation, limit.as_millis());
            Err(LedgerError::StorageUnavailable {
                reason: format!("{} timed out after {}ms", operation, limit.as_millis()),
            })
        }
    }
}
