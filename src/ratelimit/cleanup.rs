//! Periodic sweep of expired rate limit records.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::registry::LimiterSet;

/// Spawn a background task that calls `cleanup_all` every `every`.
///
/// The first sweep happens one interval after spawning. Dropping the
/// returned handle detaches the task; it then runs until the runtime shuts
/// down. Keep the handle to `abort()` it.
pub fn spawn_cleanup(limiters: Arc<LimiterSet>, every: Duration) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "Starting rate limit cleanup task");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let removed = limiters.cleanup_all();
            debug!(
                removed,
                tracked = limiters.tracked_keys(),
                "Rate limit cleanup sweep finished"
            );
        }
    })
}
