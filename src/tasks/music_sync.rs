//! Music sync observer task

use std::sync::Arc;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, info, warn};

use crate::state::{AppState, TimerEvent};

/// Background task that forwards timer lifecycle events to the music
/// controller. Take the receiver before the server starts so no event is
/// missed.
pub async fn music_sync_task(state: Arc<AppState>, mut events: Receiver<TimerEvent>) {
    info!("Starting music sync task");

    loop {
        match events.recv().await {
            Ok(event) => {
                debug!("Music sync received {:?}", event);
                state.sync_music(&event);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Music sync lagged, skipped {} timer events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }

    info!("Music sync task stopped");
}
