//! State management module
//! 
//! Timer engine, snapshot format, restoration, music sync, and the shared
//! application state that ties them together.

pub mod app_state;
pub mod music_state;
pub mod restoration;
pub mod snapshot;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, Backends, MusicView, Settings, StatusKind, StatusMessage, TickerCommand};
pub use music_state::{LastAction, MusicSyncController, MusicSyncState, SyncAction};
pub use restoration::{deadline_after, reconcile, remaining_secs};
pub use snapshot::TimerSnapshot;
pub use timer_state::{TimerEffect, TimerEngine, TimerEvent, TimerPhase, TimerView};
