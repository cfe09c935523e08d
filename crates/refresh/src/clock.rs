//! Maps scheduler ticks onto wall-clock cycle times.

use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;

/// Anchors a monotonic instant to a wall-clock time.
///
/// A cycle stamped with `cycle_time(tick)` gets the tick's scheduled time,
/// not the moment the task woke up. Ticks one interval apart therefore
/// produce cycle times exactly one interval apart, whatever the wake-up
/// jitter.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    start: Instant,
    wall: DateTime<Utc>,
}

impl TickClock {
    pub fn new() -> Self {
        Self::anchored(Instant::now(), Utc::now())
    }

    pub fn anchored(start: Instant, wall: DateTime<Utc>) -> Self {
        Self { start, wall }
    }

    /// Wall-clock time of a tick. Ticks before the anchor map to the anchor.
    pub fn cycle_time(&self, tick: Instant) -> DateTime<Utc> {
        let elapsed = tick.saturating_duration_since(self.start);
        Duration::from_std(elapsed)
            .ok()
            .and_then(|d| self.wall.checked_add_signed(d))
            .unwrap_or(self.wall)
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}
