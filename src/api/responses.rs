//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    content::MusicTrack,
    state::{MusicView, StatusMessage, TimerView},
};

/// Response for timer endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerView,
}

impl TimerResponse {
    pub fn new(message: String, timer: TimerView) -> Self {
        Self {
            status: "ok".to_string(),
            message,
            timestamp: Utc::now(),
            timer,
        }
    }
}

/// Response for music endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub music: MusicView,
}

impl MusicResponse {
    pub fn new(message: String, music: MusicView) -> Self {
        Self {
            status: "ok".to_string(),
            message,
            timestamp: Utc::now(),
            music,
        }
    }
}

/// Catalogue entry with its picker label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueEntry {
    #[serde(flatten)]
    pub track: MusicTrack,
    /// `Title (duration)`
    pub label: String,
}

impl From<&MusicTrack> for CatalogueEntry {
    fn from(track: &MusicTrack) -> Self {
        Self {
            label: track.label(),
            track: track.clone(),
        }
    }
}

/// Built-in, custom, and active messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub builtin: Vec<String>,
    pub custom: Vec<String>,
    pub selected: Option<String>,
    pub active: String,
}

/// Body returned with every non-2xx status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Full status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: TimerView,
    pub music: MusicView,
    pub active_message: String,
    pub status_message: Option<StatusMessage>,
    pub persistence_enabled: bool,
    pub memory_only: bool,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
