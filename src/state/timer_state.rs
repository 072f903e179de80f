//! Countdown engine
//!
//! The engine is a deadline-based state machine with no internal threads
//! and no clock of its own: every operation receives `now` in epoch
//! milliseconds and returns the side effects the caller must carry out.
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --resume--> Running
//!   ^                |                  |
//!   +----reset-------+------reset-------+
//!   +----tick reaches zero (Expired)----+
//! ```

use serde::{Deserialize, Serialize};

use super::restoration::{deadline_after, remaining_secs};
use super::snapshot::TimerSnapshot;
use crate::error::TimerError;

/// Lifecycle events observers can react to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    Started { time_left_secs: u64, end_timestamp_ms: i64 },
    Paused { time_left_secs: u64 },
    Stopped,
    Expired,
}

/// Side effect requested by a transition, executed in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEffect {
    /// Write the current snapshot (subject to the store's own gating)
    Persist,
    /// Delete the persisted snapshot
    ClearPersisted,
    Emit(TimerEvent),
    Notify { title: String, body: String },
    /// (Re)start the one-second ticker, cancelling any running one
    ArmTicker,
    DisarmTicker,
}

/// Display phase derived from the engine fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

/// Read-only view of the timer at an instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerView {
    pub phase: TimerPhase,
    pub time_left_secs: u64,
    /// `MM:SS`
    pub display: String,
    pub end_timestamp_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerEngine {
    time_left_secs: u64,
    is_running: bool,
    started_at_ms: Option<i64>,
    paused_duration_ms: i64,
    end_timestamp_ms: Option<i64>,
}

pub const EXPIRED_TITLE: &str = "⏰ Time's up!";
pub const EXPIRED_BODY: &str = "The timer has finished.";
pub const NO_TIME_TITLE: &str = "⚠️ No time set";
pub const NO_TIME_BODY: &str = "Choose a duration with the minute buttons first!";

/// Longest duration a single start or adjustment may carry (about 19 years)
pub const MAX_MINUTES: f64 = 10_000_000.0;

/// Upper bound on the time left on the clock
const MAX_SECS: i64 = MAX_MINUTES as i64 * 60;

/// Whole minutes to whole seconds, rejecting NaN, infinities and anything
/// beyond [`MAX_MINUTES`] either way
fn minutes_to_secs(minutes: f64) -> Result<i64, TimerError> {
    if !minutes.is_finite() || minutes.abs() > MAX_MINUTES {
        return Err(TimerError::InvalidDuration(minutes.to_string()));
    }
    Ok((minutes * 60.0).round() as i64)
}

/// `MM:SS`, minutes allowed past 99
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

impl TimerEngine {
    /// Create an idle engine
    pub fn new() -> Self {
        Self::default()
    }

    // Queries

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn end_timestamp_ms(&self) -> Option<i64> {
        self.end_timestamp_ms
    }

    pub fn paused_duration_ms(&self) -> i64 {
        self.paused_duration_ms
    }

    /// Remaining seconds, re-derived from the deadline while running
    pub fn time_left_secs(&self, now_ms: i64) -> u64 {
        match (self.is_running, self.end_timestamp_ms) {
            (true, Some(end)) => remaining_secs(end, now_ms),
            _ => self.time_left_secs,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        if self.is_running {
            TimerPhase::Running
        } else if self.time_left_secs > 0 {
            TimerPhase::Paused
        } else {
            TimerPhase::Idle
        }
    }

    pub fn view(&self, now_ms: i64) -> TimerView {
        let time_left_secs = self.time_left_secs(now_ms);
        TimerView {
            phase: self.phase(),
            time_left_secs,
            display: format_clock(time_left_secs),
            end_timestamp_ms: self.end_timestamp_ms,
        }
    }

    pub fn snapshot(&self, now_ms: i64) -> TimerSnapshot {
        TimerSnapshot {
            time_left_secs: self.time_left_secs(now_ms),
            is_running: self.is_running,
            started_at_ms: self.started_at_ms,
            paused_duration_ms: self.paused_duration_ms,
            end_timestamp_ms: self.end_timestamp_ms,
            saved_at_ms: now_ms,
        }
    }

    // Commands

    /// Install a reconciled snapshot at boot
    pub fn prime(&mut self, snapshot: &TimerSnapshot, now_ms: i64) -> Vec<TimerEffect> {
        self.time_left_secs = snapshot.time_left_secs;
        self.is_running = snapshot.is_running;
        self.started_at_ms = snapshot.started_at_ms;
        self.paused_duration_ms = snapshot.paused_duration_ms;
        let fallback_end = deadline_after(now_ms, self.time_left_secs);
        self.end_timestamp_ms = snapshot
            .end_timestamp_ms
            .or(self.is_running.then_some(fallback_end));

        if self.is_running && self.time_left_secs > 0 {
            vec![TimerEffect::ArmTicker]
        } else {
            Vec::new()
        }
    }

    /// Begin a fresh run of `minutes`
    pub fn start(&mut self, minutes: f64, now_ms: i64) -> Result<Vec<TimerEffect>, TimerError> {
        let secs = minutes_to_secs(minutes)?.max(0);
        self.time_left_secs = secs as u64;
        self.is_running = true;
        self.started_at_ms = Some(now_ms);
        self.paused_duration_ms = 0;
        let end = deadline_after(now_ms, self.time_left_secs);
        self.end_timestamp_ms = Some(end);

        Ok(vec![
            TimerEffect::ArmTicker,
            TimerEffect::Emit(TimerEvent::Started {
                time_left_secs: self.time_left_secs,
                end_timestamp_ms: end,
            }),
            TimerEffect::Persist,
        ])
    }

    /// Add (positive) or remove (negative) minutes
    pub fn adjust(&mut self, delta_minutes: f64, now_ms: i64) -> Result<Vec<TimerEffect>, TimerError> {
        let delta_secs = minutes_to_secs(delta_minutes)?;

        if self.is_running {
            let latest = deadline_after(now_ms, MAX_SECS as u64);
            let end = self
                .end_timestamp_ms
                .unwrap_or_else(|| deadline_after(now_ms, self.time_left_secs));
            let end = end.saturating_add(delta_secs * 1000).clamp(now_ms, latest);
            self.end_timestamp_ms = Some(end);
            self.time_left_secs = remaining_secs(end, now_ms);
        } else {
            let left = i64::try_from(self.time_left_secs).unwrap_or(MAX_SECS).saturating_add(delta_secs);
            self.time_left_secs = left.clamp(0, MAX_SECS) as u64;
        }

        Ok(vec![TimerEffect::Persist])
    }

    /// Continue from the remaining time
    pub fn resume(&mut self, now_ms: i64) -> Result<Vec<TimerEffect>, TimerError> {
        self.time_left_secs = self.time_left_secs(now_ms);
        if self.time_left_secs == 0 {
            return Err(TimerError::NoTimeSet);
        }

        self.is_running = true;
        self.started_at_ms = Some(now_ms - self.paused_duration_ms);
        let end = deadline_after(now_ms, self.time_left_secs);
        self.end_timestamp_ms = Some(end);

        Ok(vec![
            TimerEffect::ArmTicker,
            TimerEffect::Emit(TimerEvent::Started {
                time_left_secs: self.time_left_secs,
                end_timestamp_ms: end,
            }),
            TimerEffect::Persist,
        ])
    }

    pub fn pause(&mut self, now_ms: i64) -> Vec<TimerEffect> {
        if !self.is_running {
            return Vec::new();
        }

        self.time_left_secs = self.time_left_secs(now_ms);
        self.is_running = false;
        if let Some(started) = self.started_at_ms {
            self.paused_duration_ms = now_ms - started;
        }

        vec![
            TimerEffect::DisarmTicker,
            TimerEffect::Emit(TimerEvent::Paused {
                time_left_secs: self.time_left_secs,
            }),
            TimerEffect::Persist,
        ]
    }

    pub fn reset(&mut self) -> Vec<TimerEffect> {
        *self = Self::default();

        vec![
            TimerEffect::DisarmTicker,
            TimerEffect::Emit(TimerEvent::Stopped),
            TimerEffect::ClearPersisted,
        ]
    }

    /// One-second heartbeat; a no-op once the timer is no longer running
    pub fn tick(&mut self, now_ms: i64) -> Vec<TimerEffect> {
        if !self.is_running {
            return Vec::new();
        }

        self.time_left_secs = self.time_left_secs(now_ms);
        if self.time_left_secs > 0 {
            return vec![TimerEffect::Persist];
        }

        self.is_running = false;
        self.end_timestamp_ms = None;

        vec![
            TimerEffect::DisarmTicker,
            TimerEffect::ClearPersisted,
            TimerEffect::Emit(TimerEvent::Expired),
            TimerEffect::Notify {
                title: EXPIRED_TITLE.to_string(),
                body: EXPIRED_BODY.to_string(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn events(effects: &[TimerEffect]) -> Vec<TimerEvent> {
        effects
            .iter()
            .filter_map(|e| match e {
                TimerEffect::Emit(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_sets_deadline_and_arms_ticker() {
        let mut engine = TimerEngine::new();
        let effects = engine.start(25.0, T0).unwrap();

        assert!(engine.is_running());
        assert_eq!(engine.time_left_secs(T0), 1500);
        assert_eq!(engine.end_timestamp_ms(), Some(T0 + 1_500_000));
        assert_eq!(effects[0], TimerEffect::ArmTicker);
        assert_eq!(
            events(&effects),
            vec![TimerEvent::Started { time_left_secs: 1500, end_timestamp_ms: T0 + 1_500_000 }]
        );
    }

    #[test]
    fn start_rounds_fractional_minutes() {
        let mut engine = TimerEngine::new();
        engine.start(0.51, T0).unwrap();
        assert_eq!(engine.time_left_secs(T0), 31);
        assert!(engine.start(f64::NAN, T0).is_err());
    }

    #[test]
    fn huge_durations_are_rejected() {
        let mut engine = TimerEngine::new();
        assert!(matches!(engine.start(1e17, T0), Err(TimerError::InvalidDuration(_))));
        assert!(matches!(engine.start(-1e17, T0), Err(TimerError::InvalidDuration(_))));
        assert_eq!(engine, TimerEngine::new());

        engine.start(MAX_MINUTES, T0).unwrap();
        assert_eq!(engine.time_left_secs(T0), MAX_SECS as u64);
    }

    #[test]
    fn adjust_rejects_huge_deltas_and_caps_the_total() {
        let mut engine = TimerEngine::new();
        engine.start(10.0, T0).unwrap();
        assert!(matches!(engine.adjust(1e17, T0), Err(TimerError::InvalidDuration(_))));
        assert_eq!(engine.time_left_secs(T0), 600);

        for _ in 0..3 {
            engine.adjust(MAX_MINUTES, T0).unwrap();
        }
        assert_eq!(engine.time_left_secs(T0), MAX_SECS as u64);

        engine.pause(T0);
        engine.adjust(MAX_MINUTES, T0).unwrap();
        assert_eq!(engine.time_left_secs(T0), MAX_SECS as u64);
        assert!(matches!(engine.adjust(-1e17, T0), Err(TimerError::InvalidDuration(_))));
        engine.adjust(-MAX_MINUTES, T0).unwrap();
        assert_eq!(engine.time_left_secs(T0), 0);
    }

    #[test]
    fn observation_follows_deadline_not_ticks() {
        let mut engine = TimerEngine::new();
        engine.start(1.0, T0).unwrap();
        // No ticks delivered for 42.4 seconds
        assert_eq!(engine.time_left_secs(T0 + 42_400), 18);
        assert_eq!(engine.view(T0 + 42_400).display, "00:18");
    }

    #[test]
    fn adjustments_while_running_stay_on_the_deadline() {
        let mut engine = TimerEngine::new();
        engine.start(10.0, T0).unwrap();

        let deltas = [5.0, -2.5, 0.25, -1.0, 3.0];
        let mut now = T0;
        for delta in deltas {
            now += 7_300;
            engine.adjust(delta, now).unwrap();
            let end = engine.end_timestamp_ms().unwrap();
            for probe in [now, now + 999, now + 61_234] {
                assert_eq!(engine.time_left_secs(probe), remaining_secs(end, probe));
            }
        }
    }

    #[test]
    fn large_negative_adjust_clamps_to_now() {
        let mut engine = TimerEngine::new();
        engine.start(5.0, T0).unwrap();
        engine.adjust(-500.0, T0 + 1_000).unwrap();
        assert_eq!(engine.end_timestamp_ms(), Some(T0 + 1_000));
        assert_eq!(engine.time_left_secs(T0 + 1_000), 0);
        assert_eq!(engine.time_left_secs(T0 + 9_000), 0);
    }

    #[test]
    fn adjust_while_stopped_clamps_at_zero() {
        let mut engine = TimerEngine::new();
        engine.adjust(2.0, T0).unwrap();
        assert_eq!(engine.time_left_secs(T0), 120);
        assert_eq!(engine.phase(), TimerPhase::Paused);
        engine.adjust(-10.0, T0).unwrap();
        assert_eq!(engine.time_left_secs(T0), 0);
        assert_eq!(engine.phase(), TimerPhase::Idle);
    }

    #[test]
    fn pause_then_resume_recomputes_deadline() {
        let mut engine = TimerEngine::new();
        engine.start(10.0, T0).unwrap();

        let paused_at = T0 + 3_000;
        let effects = engine.pause(paused_at);
        assert_eq!(engine.time_left_secs(paused_at), 597);
        assert_eq!(engine.paused_duration_ms(), 3_000);
        assert_eq!(events(&effects), vec![TimerEvent::Paused { time_left_secs: 597 }]);

        let resumed_at = paused_at + 60_000;
        engine.resume(resumed_at).unwrap();
        assert_eq!(engine.end_timestamp_ms(), Some(resumed_at + 597_000));
        assert_eq!(engine.snapshot(resumed_at).started_at_ms, Some(resumed_at - 3_000));
    }

    #[test]
    fn pause_when_not_running_is_noop() {
        let mut engine = TimerEngine::new();
        assert!(engine.pause(T0).is_empty());
    }

    #[test]
    fn resume_without_time_reports_no_time_set() {
        let mut engine = TimerEngine::new();
        assert_eq!(engine.resume(T0), Err(TimerError::NoTimeSet));
        assert!(!engine.is_running());
    }

    #[test]
    fn reset_zeroes_everything_and_clears_store() {
        let mut engine = TimerEngine::new();
        engine.start(3.0, T0).unwrap();
        let effects = engine.reset();

        assert_eq!(engine, TimerEngine::new());
        assert!(effects.contains(&TimerEffect::ClearPersisted));
        assert!(effects.contains(&TimerEffect::DisarmTicker));
        assert_eq!(events(&effects), vec![TimerEvent::Stopped]);
    }

    #[test]
    fn tick_expires_once() {
        let mut engine = TimerEngine::new();
        engine.start(0.05, T0).unwrap();

        assert_eq!(engine.tick(T0 + 1_000), vec![TimerEffect::Persist]);

        let effects = engine.tick(T0 + 3_000);
        assert!(!engine.is_running());
        assert_eq!(engine.end_timestamp_ms(), None);
        assert!(effects.contains(&TimerEffect::ClearPersisted));
        assert_eq!(events(&effects), vec![TimerEvent::Expired]);
        assert!(effects.iter().any(|e| matches!(e, TimerEffect::Notify { .. })));

        assert!(engine.tick(T0 + 4_000).is_empty());
    }

    #[test]
    fn prime_rearms_running_snapshot() {
        let mut engine = TimerEngine::new();
        let snapshot = TimerSnapshot {
            time_left_secs: 120,
            is_running: true,
            started_at_ms: Some(T0 - 1_000),
            paused_duration_ms: 0,
            end_timestamp_ms: Some(T0 + 120_000),
            saved_at_ms: T0 - 500,
        };
        assert_eq!(engine.prime(&snapshot, T0), vec![TimerEffect::ArmTicker]);
        assert_eq!(engine.time_left_secs(T0 + 20_000), 100);

        let mut paused = TimerEngine::new();
        let snapshot = TimerSnapshot { is_running: false, ..snapshot };
        assert!(paused.prime(&snapshot, T0).is_empty());
        assert_eq!(paused.phase(), TimerPhase::Paused);
    }

    #[test]
    fn clock_format_pads() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(597), "09:57");
        assert_eq!(format_clock(6_000), "100:00");
    }
}
