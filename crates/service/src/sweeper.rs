//! Periodic expired-entry sweep.
//!
//! TTL expiry is otherwise lazy (checked on read), so low-traffic
//! installs would hold expired summaries indefinitely. The sweeper
//! bounds worst-case memory by purging on a fixed interval regardless
//! of access patterns.

use std::sync::Arc;

use litmark_core::limits::SWEEP_INTERVAL;
use tokio::task::JoinHandle;

use crate::coordinator::Coordinator;

/// Spawn the sweep task. Runs until aborted.
pub fn spawn_sweeper(coordinator: Arc<Coordinator>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            match coordinator.sweep_summaries().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "swept expired summaries"),
                Err(e) => tracing::warn!("summary sweep failed: {e}"),
            }
        }
    })
}
