//! Background tasks module
//! 
//! This module contains background tasks that run alongside the HTTP server.

pub mod autosave;
pub mod countdown;
pub mod music_sync;

// Re-export main functions
pub use autosave::autosave_task;
pub use countdown::{countdown_task, TICK_PERIOD};
pub use music_sync::music_sync_task;
