//! Error types
//!
//! Each concern gets its own enum so callers can tell recoverable
//! conditions (no time set, invalid link) from infrastructure failures.

use thiserror::Error;

/// Errors raised by timer operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// Resume was requested with nothing left on the clock
    #[error("no time set: choose a duration first")]
    NoTimeSet,

    /// Duration or adjustment was not a finite number of minutes
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("timer state unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the key-value store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store previously failed and now runs in memory-only mode
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a music player backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("no track loaded")]
    NotLoaded,

    #[error("player command failed: {0}")]
    Command(String),
}

/// Errors raised by manual music actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MusicError {
    #[error("invalid YouTube link: {0}")]
    InvalidLink(String),

    #[error("no music selected")]
    NoMusicSelected,

    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error("music state unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while reading content documents or editing messages
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected document shape: {0}")]
    Shape(String),

    #[error("message text is empty")]
    EmptyMessage,

    #[error("no custom message at index {0}")]
    NoSuchMessage(usize),

    #[error("messages unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
