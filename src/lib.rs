//! Focus Timer - A countdown timer with background music sync
//!
//! This library provides a deadline-based countdown that survives restarts,
//! keeps a YouTube music player in step with the timer, and serves both
//! over a small HTTP API.

pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod services;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use state::AppState;
pub use utils::signals::shutdown_signal;
