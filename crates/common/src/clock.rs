//! Clock and timing utilities.
//!
//! A recording session anchors its bookmarks to a monotonic epoch taken
//! when the session enters `Recording`. Bounded waits use [`Deadline`] so
//! every loop in the recorder computes its remaining budget the same way.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// A recording clock that provides monotonic offsets relative to
/// a fixed epoch (the moment recording started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant recording started.
    epoch: Instant,

    /// Wall-clock time at epoch.
    epoch_wall: DateTime<Utc>,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: Utc::now(),
        }
    }

    /// Get seconds elapsed since recording start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at recording start.
    pub fn epoch_wall(&self) -> DateTime<Utc> {
        self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

/// A wall-clock deadline for a bounded wait.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    at: Instant,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            at: started + budget,
        }
    }

    /// Time left before expiry (zero once expired).
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time spent waiting so far.
    pub fn waited(&self) -> Duration {
        self.started.elapsed()
    }

    /// The next sleep step: `step`, clipped to what is left.
    pub fn step(&self, step: Duration) -> Duration {
        step.min(self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = RecordingClock::start();
        assert!(clock.elapsed_secs() < 1.0);
        assert!(clock.epoch_wall() <= Utc::now());
    }

    #[test]
    fn zero_deadline_is_expired() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
        assert_eq!(deadline.step(Duration::from_millis(100)), Duration::ZERO);
    }

    #[test]
    fn step_is_clipped_to_remaining_budget() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(!deadline.expired());
        assert_eq!(
            deadline.step(Duration::from_millis(100)),
            Duration::from_millis(100)
        );
        assert!(deadline.remaining() <= Duration::from_secs(60));
    }
}
