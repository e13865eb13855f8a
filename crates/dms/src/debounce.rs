//! Time-qualified condition timers

use std::time::{Duration, Instant};

/// Turns an instantaneous condition into "held continuously for at least
/// `threshold`".
///
/// `start` is `None` exactly when the condition was false on the most recent
/// update or has not been observed since the last reset. Time comes from the
/// caller, so irregular or dropped ticks never stretch or shrink the window:
/// only the real elapsed time between observations counts.
#[derive(Debug, Clone)]
pub struct TemporalDebouncer {
    threshold: Duration,
    start: Option<Instant>,
}

impl TemporalDebouncer {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            start: None,
        }
    }

    /// Feed one observation; returns whether the condition is sustained.
    pub fn update(&mut self, condition: bool, now: Instant) -> bool {
        if !condition {
            self.start = None;
            return false;
        }

        match self.start {
            None => {
                // First true observation never counts, even with a zero threshold.
                self.start = Some(now);
                false
            }
            Some(start) => now.saturating_duration_since(start) >= self.threshold,
        }
    }

    /// How long the condition has been continuously true
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.start.map(|start| now.saturating_duration_since(start))
    }

    pub fn is_armed(&self) -> bool {
        self.start.is_some()
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TICK: Duration = Duration::from_nanos(33_333_333);

    #[test]
    fn test_first_observation_is_not_sustained() {
        let mut timer = TemporalDebouncer::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(!timer.update(true, t0));
        assert!(timer.update(true, t0));
    }

    #[test]
    fn test_false_resets() {
        let mut timer = TemporalDebouncer::new(Duration::from_secs(1));
        let t0 = Instant::now();
        timer.update(true, t0);
        assert!(timer.is_armed());

        assert!(!timer.update(false, t0 + Duration::from_millis(500)));
        assert!(!timer.is_armed());
        assert_eq!(timer.elapsed(t0 + Duration::from_secs(2)), None);
    }

    #[test]
    fn test_short_closure_never_sustains() {
        // 6 ticks at 30 Hz = 0.2 s against a 2.5 s window
        let mut timer = TemporalDebouncer::new(Duration::from_millis(2500));
        let t0 = Instant::now();
        for i in 0..6u32 {
            assert!(!timer.update(true, t0 + TICK * i));
        }
    }

    #[test]
    fn test_sustained_from_first_tick_at_threshold() {
        let threshold = Duration::from_millis(2500);
        let mut timer = TemporalDebouncer::new(threshold);
        let t0 = Instant::now();

        for i in 0..90u32 {
            let elapsed = TICK * i;
            assert_eq!(timer.update(true, t0 + elapsed), elapsed >= threshold, "tick {}", i);
        }
    }

    #[test]
    fn test_single_open_tick_restarts_countdown() {
        let threshold = Duration::from_millis(5000);
        let mut timer = TemporalDebouncer::new(threshold);
        let t0 = Instant::now();

        // closed for 4.9 s
        timer.update(true, t0);
        assert!(!timer.update(true, t0 + Duration::from_millis(4900)));

        // one open tick
        let t_open = t0 + Duration::from_millis(4933);
        assert!(!timer.update(false, t_open));

        // renewed closure starts from zero
        let t_again = t_open + TICK;
        assert!(!timer.update(true, t_again));
        assert!(!timer.update(true, t_again + Duration::from_millis(4999)));
        assert!(timer.update(true, t_again + threshold));
    }

    #[test]
    fn test_dropped_ticks_use_real_elapsed_time() {
        let mut timer = TemporalDebouncer::new(Duration::from_secs(1));
        let t0 = Instant::now();
        timer.update(true, t0);
        // a long gap with no observations still counts as wall-clock time
        assert!(timer.update(true, t0 + Duration::from_millis(1200)));
        assert_eq!(timer.elapsed(t0 + Duration::from_millis(1200)), Some(Duration::from_millis(1200)));
    }

    #[test]
    fn test_clock_going_backwards_does_not_panic() {
        let mut timer = TemporalDebouncer::new(Duration::from_secs(1));
        let t0 = Instant::now() + Duration::from_secs(10);
        timer.update(true, t0);
        assert!(!timer.update(true, t0 - Duration::from_secs(5)));
    }

    proptest! {
        #[test]
        fn sustained_iff_elapsed_reaches_threshold(
            threshold_ms in 1u64..6000,
            gaps in proptest::collection::vec(1u64..200, 1..120),
        ) {
            let threshold = Duration::from_millis(threshold_ms);
            let mut timer = TemporalDebouncer::new(threshold);
            let t0 = Instant::now();
            prop_assert!(!timer.update(true, t0));

            let mut elapsed = Duration::ZERO;
            for gap in gaps {
                elapsed += Duration::from_millis(gap);
                prop_assert_eq!(timer.update(true, t0 + elapsed), elapsed >= threshold);
            }
        }
    }
}
