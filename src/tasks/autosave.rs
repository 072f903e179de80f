//! Periodic best-effort save

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::state::AppState;

/// Background task that saves the timer every `period` while it has time
/// on it. Every state change already persists; this only narrows the
/// window lost to a crash between changes.
pub async fn autosave_task(state: Arc<AppState>, period: Duration) {
    info!("Starting autosave task (every {}s)", period.as_secs());

    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        state.save_now();
    }
}
