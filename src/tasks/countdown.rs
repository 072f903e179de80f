//! Countdown ticker background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::state::{AppState, TickerCommand};

/// Heartbeat period of a running timer
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Background task that delivers one-second ticks while the timer runs.
///
/// Every arm command restarts the interval from scratch, so at most one
/// ticker is ever active; a disarm stops ticking until the next arm.
pub async fn countdown_task(state: Arc<AppState>) {
    info!("Starting countdown task");

    let mut ticker_rx = state.subscribe_ticker();

    loop {
        let command = *ticker_rx.borrow_and_update();

        match command {
            TickerCommand::Disarmed => {
                debug!("Countdown idle");
                if ticker_rx.changed().await.is_err() {
                    break;
                }
            }
            TickerCommand::Armed(generation) => {
                debug!("Countdown armed (#{})", generation);
                let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = state.tick() {
                                error!("Failed to tick timer: {}", e);
                            }
                        }
                        changed = ticker_rx.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            break;
                        }
                    }
                }
            }
        }
    }

    info!("Countdown task stopped");
}
