//! Constant-rate output scheduling.
//!
//! Captured frames arrive at irregular intervals; the output file plays back at
//! exactly `target_fps`. The pacer keeps a cursor `next_output` on the capture
//! clock. Every output frame occupies one `interval` slot, and slots that pass
//! without a captured frame are filled by repeating the previous one.

use std::time::{Duration, Instant};

/// Output-slot cursor for one recording.
#[derive(Debug, Clone)]
pub struct Pacer {
    next_output: Instant,
    interval: Duration,
}

impl Pacer {
    /// Start a cursor at `start` emitting `target_fps` slots per second.
    pub fn new(start: Instant, target_fps: u32) -> Self {
        Self {
            next_output: start,
            interval: Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1))),
        }
    }

    /// Schedule a frame captured at `captured_at`.
    ///
    /// Returns how many slots before it must be backfilled with the previous
    /// frame. The cursor ends one slot past the admitted frame.
    pub fn admit(&mut self, captured_at: Instant) -> u64 {
        let mut backfill = 0;
        while self.next_output < captured_at {
            backfill += 1;
            self.next_output += self.interval;
        }
        self.next_output += self.interval;
        backfill
    }

    /// Called when no frame arrived in time.
    ///
    /// Returns `true` (and consumes one slot) when `now` has passed the cursor,
    /// meaning the previous frame should be repeated to keep the stream moving.
    pub fn idle(&mut self, now: Instant) -> bool {
        if now > self.next_output {
            self.next_output += self.interval;
            true
        } else {
            false
        }
    }

    /// Capture-clock time of the next output slot.
    pub fn next_output(&self) -> Instant {
        self.next_output
    }

    /// Playback duration of one output frame.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
