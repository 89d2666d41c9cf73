//! Interval timer for tracking snapshots.

/// Accumulates simulated time and signals when a snapshot is due.
///
/// The timer resets on each flush, so irregular frame times never produce
/// bursts of snapshots.
#[derive(Debug, Clone)]
pub struct TelemetryReporter {
    interval: f32,
    elapsed: f32,
}

impl TelemetryReporter {
    pub fn new(interval_secs: f32) -> Self {
        Self {
            interval: interval_secs,
            elapsed: 0.0,
        }
    }

    /// Add `dt` and return `true` when a snapshot should be emitted now.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        if self.elapsed >= self.interval {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }
}
