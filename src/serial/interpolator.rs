//! Sample timestamps by linear interpolation over batch arrival times.
//!
//! The board does not timestamp its readings. A batch of `n` samples arriving
//! at `now` is spread evenly over `(previous, now]`: sample `i` (1-based) lands
//! at `previous + i × (now − previous) / n`. `previous` then moves to `now`.

use std::time::Instant;

/// Assigns session-relative times to decoded batches.
#[derive(Debug, Clone)]
pub struct TimeInterpolator {
    start: Instant,
    previous: Instant,
}

impl TimeInterpolator {
    /// Interpolator for a session that began at `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            previous: start,
        }
    }

    /// Relative times (seconds since session start) for a batch of `count`
    /// samples that arrived at `now`.
    ///
    /// An empty batch returns nothing and leaves the reference time alone.
    pub fn assign(&mut self, count: usize, now: Instant) -> Vec<f64> {
        if count == 0 {
            return Vec::new();
        }
        let base = self.previous.duration_since(self.start).as_secs_f64();
        let span = now.saturating_duration_since(self.previous).as_secs_f64();
        let step = span / count as f64;

        self.previous = self.previous.max(now);
        (1..=count).map(|i| base + i as f64 * step).collect()
    }

    /// Seconds from session start to `now`.
    pub fn relative(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.start).as_secs_f64()
    }

    /// Session start.
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Arrival time of the last non-empty batch, or the start.
    pub fn previous(&self) -> Instant {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_batch_spreads_from_start() {
        let t0 = Instant::now();
        let mut interp = TimeInterpolator::new(t0);
        let times = interp.assign(4, t0 + Duration::from_secs(1));
        assert_eq!(times, vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(interp.previous(), t0 + Duration::from_secs(1));
    }

    #[test]
    fn later_batches_continue_from_previous_arrival() {
        let t0 = Instant::now();
        let mut interp = TimeInterpolator::new(t0);
        interp.assign(1, t0 + Duration::from_millis(500));
        let times = interp.assign(2, t0 + Duration::from_millis(1500));
        assert_eq!(times, vec![1.0, 1.5]);
    }

    #[test]
    fn empty_batch_keeps_reference() {
        let t0 = Instant::now();
        let mut interp = TimeInterpolator::new(t0);
        assert!(interp.assign(0, t0 + Duration::from_secs(3)).is_empty());
        assert_eq!(interp.previous(), t0);

        let times = interp.assign(2, t0 + Duration::from_secs(4));
        assert_eq!(times, vec![2.0, 4.0]);
    }

    #[test]
    fn times_never_decrease() {
        let t0 = Instant::now();
        let mut interp = TimeInterpolator::new(t0);
        let mut last = 0.0;
        for (ms, n) in [(10, 3), (10, 1), (250, 7), (251, 2)] {
            for t in interp.assign(n, t0 + Duration::from_millis(ms)) {
                assert!(t >= last);
                last = t;
            }
        }
    }
}
