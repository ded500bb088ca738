//! Retention sweeper: age-based cleanup of visit records and expired
//! favicon entries.
//!
//! Runs once at startup and then on a fixed interval. A failed sweep is
//! logged and retried on the next tick; it is never fatal to the host
//! process.

use std::time::Duration;

use tabtrail_core::{Error, Store};
use tokio::task::JoinHandle;

const DAY_MS: i64 = 86_400_000;

/// Delete visit records whose last visit is older than the retention
/// horizon. Returns the number of deleted records.
pub async fn sweep_history(store: &Store, retention_days: i64) -> Result<u64, Error> {
    sweep_history_at(store, retention_days, chrono::Utc::now().timestamp_millis()).await
}

/// Like [`sweep_history`] with an explicit current time.
pub async fn sweep_history_at(store: &Store, retention_days: i64, now_ms: i64) -> Result<u64, Error> {
    let cutoff = now_ms - retention_days * DAY_MS;
    let deleted = store.delete_visits_before(cutoff).await?;
    if deleted > 0 {
        tracing::info!(deleted, retention_days, "retention sweep removed old visit records");
    }
    Ok(deleted)
}

/// Delete expired favicon cache entries. Returns the number deleted.
pub async fn sweep_favicons(store: &Store) -> Result<u64, Error> {
    let deleted = store.purge_expired_favicons().await?;
    if deleted > 0 {
        tracing::info!(deleted, "favicon sweep removed expired entries");
    }
    Ok(deleted)
}

/// Spawn the periodic sweep job.
///
/// The first sweep runs immediately, then every `interval`. Errors are
/// swallowed after logging so a transient storage fault only costs one
/// cycle.
pub fn spawn_periodic(store: Store, retention_days: i64, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            if let Err(e) = sweep_history(&store, retention_days).await {
                tracing::warn!(error = %e, "retention sweep failed; will retry next cycle");
            }
            if let Err(e) = sweep_favicons(&store).await {
                tracing::warn!(error = %e, "favicon sweep failed; will retry next cycle");
            }
        }
    })
}
