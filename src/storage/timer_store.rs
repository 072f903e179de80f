//! Gated persistence of the timer snapshot
//!
//! Writes stay closed until the boot sequence has attempted restoration, so
//! the initial zero-state render can never overwrite a snapshot that has not
//! been read yet.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, error, info, warn};

use super::KeyValueStore;
use crate::error::StoreError;
use crate::state::{reconcile, TimerSnapshot};

/// Storage key of the snapshot
pub const TIMER_STATE_KEY: &str = "cronometro_timer_state";

pub struct TimerStore {
    kv: Arc<dyn KeyValueStore>,
    can_persist: AtomicBool,
    memory_only: AtomicBool,
}

impl TimerStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            can_persist: AtomicBool::new(false),
            memory_only: AtomicBool::new(false),
        }
    }

    /// Allow writes; called once restoration has been attempted
    pub fn open_gate(&self) {
        if !self.can_persist.swap(true, Ordering::SeqCst) {
            debug!("Persistence gate opened");
        }
    }

    pub fn can_persist(&self) -> bool {
        self.can_persist.load(Ordering::SeqCst)
    }

    /// True after a write failure switched the session to memory only
    pub fn is_memory_only(&self) -> bool {
        self.memory_only.load(Ordering::SeqCst)
    }

    /// Persist `snapshot`.
    ///
    /// Skipped while the gate is closed and for idle snapshots; an idle
    /// snapshot never deletes an existing entry either.
    pub fn save(&self, snapshot: &TimerSnapshot) {
        if !self.can_persist() || self.is_memory_only() || snapshot.is_empty() {
            return;
        }

        let result = snapshot
            .encode()
            .map_err(StoreError::from)
            .and_then(|raw| self.kv.set(TIMER_STATE_KEY, &raw));

        if let Err(e) = result {
            error!("Failed to save timer state: {}, continuing in memory-only mode", e);
            self.memory_only.store(true, Ordering::SeqCst);
        }
    }

    /// Read and reconcile the stored snapshot.
    ///
    /// Malformed and expired entries are deleted and reported as absent.
    pub fn load(&self, now_ms: i64) -> Option<TimerSnapshot> {
        let raw = match self.kv.get(TIMER_STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read timer state: {}", e);
                return None;
            }
        };

        let Some(snapshot) = TimerSnapshot::decode(&raw) else {
            warn!("Discarding malformed timer state");
            self.clear();
            return None;
        };

        match reconcile(&snapshot, now_ms) {
            Some(restored) => {
                info!("Loaded timer state: {}s left, running={}",
                      restored.time_left_secs, restored.is_running);
                Some(restored)
            }
            None => {
                info!("Stored timer already expired, discarding it");
                self.clear();
                None
            }
        }
    }

    /// Delete the snapshot; only terminal events call this
    pub fn clear(&self) {
        if let Err(e) = self.kv.remove(TIMER_STATE_KEY) {
            warn!("Failed to clear timer state: {}", e);
        }
    }
}
