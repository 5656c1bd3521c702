/// When and how often the upload task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSpec {
    /// Anchor instant (epoch ms) all runs are phase-locked to.
    pub anchor_ms: i64,
    /// Interval between runs in milliseconds. Must be > 0; the
    /// configuration layer rejects anything else before a timer is armed.
    pub interval_ms: i64,
}

/// Compute the next execution instant after `now_ms`.
///
/// Returns the smallest `t > now` with `t ≡ anchor (mod interval)`, so the
/// schedule stays phase-locked to the anchor no matter how much wall-clock
/// time has passed since it was set. `rem_euclid` normalizes the
/// intermediate into `[0, interval)`, which keeps the result correct when
/// the anchor lies in the future.
pub fn compute_next_run(anchor_ms: i64, interval_ms: i64, now_ms: i64) -> i64 {
    debug_assert!(interval_ms > 0);
    now_ms - (now_ms - anchor_ms).rem_euclid(interval_ms) + interval_ms
}
