use std::time::{Duration, Instant};

/// Time source and blocking primitive used by the pacer.
pub trait Clock {
    /// Monotonic time since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Block the calling thread for at least `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock that only moves when told to.
///
/// Work is simulated with [`ManualClock::advance`]. Every sleep advances the
/// clock by the requested duration plus a fixed overshoot, which models the
/// OS waking the thread late. Requested sleeps are recorded for inspection.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Duration,
    overshoot: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock whose sleeps always run `overshoot` longer than requested.
    pub fn with_overshoot(overshoot: Duration) -> Self {
        Self {
            overshoot,
            ..Self::default()
        }
    }

    /// Let `duration` of simulated work pass.
    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
    }

    /// Every duration passed to [`Clock::sleep`], oldest first.
    pub fn sleeps(&self) -> &[Duration] {
        &self.sleeps
    }

    pub fn last_sleep(&self) -> Option<Duration> {
        self.sleeps.last().copied()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
        self.now += duration + self.overshoot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn system_clock_sleeps_at_least_requested() {
        let mut clock = SystemClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_millis(2));
        assert!(clock.now() - before >= Duration::from_millis(2));
    }

    #[test]
    fn manual_clock_advances_only_on_demand() {
        let mut clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.advance(Duration::from_millis(10));
        assert_eq!(clock.now(), Duration::from_millis(10));
    }

    #[test]
    fn manual_clock_applies_overshoot_and_records() {
        let mut clock = ManualClock::with_overshoot(Duration::from_micros(300));
        clock.sleep(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_micros(5300));
        assert_eq!(clock.sleeps(), &[Duration::from_millis(5)]);
        assert_eq!(clock.last_sleep(), Some(Duration::from_millis(5)));
    }
}
