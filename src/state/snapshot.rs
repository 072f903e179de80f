//! Persisted timer snapshot

use serde::{Deserialize, Serialize};

/// Timer state as written to the key-value store.
///
/// The JSON keys match the ones the web page has always used so that state
/// saved by older front-ends restores cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    /// Remaining seconds when the snapshot was taken
    #[serde(rename = "timeLeft")]
    pub time_left_secs: u64,
    pub is_running: bool,
    /// Wall-clock start of the current run segment
    #[serde(rename = "startTime")]
    pub started_at_ms: Option<i64>,
    /// Elapsed-since-start captured at the last pause
    #[serde(rename = "pausedTime")]
    pub paused_duration_ms: i64,
    /// Absolute deadline, authoritative while running
    #[serde(rename = "endTimestamp")]
    pub end_timestamp_ms: Option<i64>,
    #[serde(rename = "timestamp")]
    pub saved_at_ms: i64,
}

/// Lenient wire form; anything that fails here is treated as malformed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    time_left: f64,
    #[serde(default)]
    is_running: bool,
    #[serde(default)]
    start_time: Option<f64>,
    #[serde(default)]
    paused_time: Option<f64>,
    #[serde(default)]
    end_timestamp: Option<f64>,
    #[serde(default)]
    timestamp: Option<f64>,
}

impl TimerSnapshot {
    /// Idle snapshots carry nothing worth restoring
    pub fn is_empty(&self) -> bool {
        self.time_left_secs == 0 && !self.is_running
    }

    /// Deadline if it is a usable positive timestamp
    pub fn valid_end_timestamp(&self) -> Option<i64> {
        self.end_timestamp_ms.filter(|end| *end > 0)
    }

    /// Decode a stored snapshot.
    ///
    /// Returns `None` for bad JSON, a missing `timestamp`, or a non-numeric
    /// `timeLeft`.
    pub fn decode(raw: &str) -> Option<Self> {
        let raw: RawSnapshot = serde_json::from_str(raw).ok()?;
        let saved_at = raw.timestamp.filter(|t| t.is_finite() && *t > 0.0)?;
        if !raw.time_left.is_finite() {
            return None;
        }

        Some(Self {
            time_left_secs: raw.time_left.max(0.0).round() as u64,
            is_running: raw.is_running,
            started_at_ms: raw.start_time.filter(|t| t.is_finite()).map(|t| t as i64),
            paused_duration_ms: raw
                .paused_time
                .filter(|t| t.is_finite())
                .map(|t| t as i64)
                .unwrap_or(0),
            end_timestamp_ms: raw.end_timestamp.filter(|t| t.is_finite()).map(|t| t as i64),
            saved_at_ms: saved_at as i64,
        })
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
