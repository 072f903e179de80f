//! Boot-time reconciliation of a persisted snapshot against the wall clock

use super::snapshot::TimerSnapshot;

/// Whole seconds left until `end_ms`, never negative
pub fn remaining_secs(end_ms: i64, now_ms: i64) -> u64 {
    let delta = end_ms.saturating_sub(now_ms).max(0);
    (delta as f64 / 1000.0).round() as u64
}

/// Deadline `secs` after `now_ms`, saturating instead of overflowing
pub fn deadline_after(now_ms: i64, secs: u64) -> i64 {
    now_ms.saturating_add(secs_to_ms(secs))
}

fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000)
}

/// Decide what a stored snapshot means at `now_ms`.
///
/// Returns `None` when the countdown would already have reached zero.
pub fn reconcile(snapshot: &TimerSnapshot, now_ms: i64) -> Option<TimerSnapshot> {
    let end = snapshot.valid_end_timestamp();

    if snapshot.is_running {
        if let Some(end) = end {
            let remaining = remaining_secs(end, now_ms);
            if remaining == 0 {
                return None;
            }
            let consumed = snapshot.time_left_secs.saturating_sub(remaining);
            return Some(TimerSnapshot {
                time_left_secs: remaining,
                is_running: true,
                started_at_ms: Some(now_ms.saturating_sub(secs_to_ms(consumed))),
                paused_duration_ms: 0,
                end_timestamp_ms: Some(end),
                saved_at_ms: snapshot.saved_at_ms,
            });
        }

        if snapshot.time_left_secs > 0 {
            // Degraded snapshot without a deadline: count from the save time.
            let elapsed = (now_ms.saturating_sub(snapshot.saved_at_ms).max(0) / 1000) as u64;
            let remaining = snapshot.time_left_secs.saturating_sub(elapsed);
            if remaining == 0 {
                return None;
            }
            return Some(TimerSnapshot {
                time_left_secs: remaining,
                is_running: true,
                started_at_ms: Some(now_ms.saturating_sub(secs_to_ms(elapsed))),
                paused_duration_ms: 0,
                end_timestamp_ms: Some(deadline_after(now_ms, remaining)),
                saved_at_ms: snapshot.saved_at_ms,
            });
        }
    }

    Some(TimerSnapshot {
        is_running: false,
        end_timestamp_ms: end,
        ..snapshot.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn running(time_left: u64, end: Option<i64>, saved_at: i64) -> TimerSnapshot {
        TimerSnapshot {
            time_left_secs: time_left,
            is_running: true,
            started_at_ms: Some(saved_at),
            paused_duration_ms: 0,
            end_timestamp_ms: end,
            saved_at_ms: saved_at,
        }
    }

    #[test]
    fn past_deadline_is_discarded() {
        let snapshot = running(10, Some(NOW - 5_000), NOW - 15_000);
        assert!(reconcile(&snapshot, NOW).is_none());
    }

    #[test]
    fn future_deadline_resumes_with_recomputed_time() {
        let snapshot = running(150, Some(NOW + 120_000), NOW - 30_000);
        let restored = reconcile(&snapshot, NOW).unwrap();
        assert_eq!(restored.time_left_secs, 120);
        assert!(restored.is_running);
        assert_eq!(restored.end_timestamp_ms, Some(NOW + 120_000));
        assert_eq!(restored.started_at_ms, Some(NOW - 30_000));
        assert_eq!(restored.paused_duration_ms, 0);
    }

    #[test]
    fn sub_half_second_remaining_counts_as_expired() {
        let snapshot = running(1, Some(NOW + 400), NOW - 600);
        assert!(reconcile(&snapshot, NOW).is_none());
    }

    #[test]
    fn legacy_snapshot_counts_from_save_time() {
        let snapshot = running(60, None, NOW - 20_500);
        let restored = reconcile(&snapshot, NOW).unwrap();
        assert_eq!(restored.time_left_secs, 40);
        assert_eq!(restored.end_timestamp_ms, Some(NOW + 40_000));
        assert_eq!(restored.started_at_ms, Some(NOW - 20_000));
    }

    #[test]
    fn legacy_snapshot_past_its_duration_is_discarded() {
        let snapshot = running(60, None, NOW - 61_000);
        assert!(reconcile(&snapshot, NOW).is_none());
    }

    #[test]
    fn extreme_stored_values_saturate() {
        let legacy = running(u64::MAX, None, i64::MIN + 1);
        let restored = reconcile(&legacy, NOW).unwrap();
        assert_eq!(restored.end_timestamp_ms, Some(i64::MAX));

        let far = running(u64::MAX, Some(i64::MAX), NOW);
        let restored = reconcile(&far, NOW).unwrap();
        assert_eq!(restored.end_timestamp_ms, Some(i64::MAX));
        assert_eq!(deadline_after(NOW, u64::MAX), i64::MAX);
    }

    #[test]
    fn paused_snapshot_is_kept_as_is() {
        let snapshot = TimerSnapshot {
            time_left_secs: 597,
            is_running: false,
            started_at_ms: Some(NOW - 3_000_000),
            paused_duration_ms: 3_000,
            end_timestamp_ms: Some(-1),
            saved_at_ms: NOW - 3_000_000,
        };
        let restored = reconcile(&snapshot, NOW).unwrap();
        assert_eq!(restored.time_left_secs, 597);
        assert!(!restored.is_running);
        assert_eq!(restored.paused_duration_ms, 3_000);
        assert_eq!(restored.end_timestamp_ms, None);
    }
}
