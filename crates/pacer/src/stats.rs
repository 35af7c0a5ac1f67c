use std::time::Duration;

/// Ring buffer of recent frame times for instrumentation.
#[derive(Debug, Clone)]
pub struct FrameStats {
    history: Vec<Duration>,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new(120)
    }
}

impl FrameStats {
    /// Keep the last `capacity` frames. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![Duration::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.index] = dt;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn recorded(&self) -> &[Duration] {
        &self.history[..self.count()]
    }

    pub fn average(&self) -> Duration {
        let count = self.count();
        if count == 0 {
            return Duration::ZERO;
        }
        let total: Duration = self.recorded().iter().sum();
        total / count as u32
    }

    pub fn max(&self) -> Duration {
        self.recorded().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.recorded().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    /// Most recently recorded frame time.
    pub fn last(&self) -> Option<Duration> {
        if self.count() == 0 {
            return None;
        }
        let i = (self.index + self.capacity - 1) % self.capacity;
        Some(self.history[i])
    }

    /// Frames per second implied by the average frame time.
    pub fn fps(&self) -> f64 {
        let avg = self.average().as_secs_f64();
        if avg > 0.0 { 1.0 / avg } else { 0.0 }
    }

    pub fn count(&self) -> usize {
        if self.filled {
            self.capacity
        } else {
            self.index
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats() {
        let stats = FrameStats::new(4);
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.average(), Duration::ZERO);
        assert_eq!(stats.last(), None);
        assert_eq!(stats.fps(), 0.0);
    }

    #[test]
    fn average_min_max() {
        let mut stats = FrameStats::new(8);
        stats.record(Duration::from_millis(10));
        stats.record(Duration::from_millis(20));
        stats.record(Duration::from_millis(30));
        assert_eq!(stats.count(), 3);
        assert_eq!(stats.average(), Duration::from_millis(20));
        assert_eq!(stats.min(), Duration::from_millis(10));
        assert_eq!(stats.max(), Duration::from_millis(30));
        assert_eq!(stats.last(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn wraps_at_capacity() {
        let mut stats = FrameStats::new(2);
        stats.record(Duration::from_millis(100));
        stats.record(Duration::from_millis(10));
        stats.record(Duration::from_millis(20));
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.max(), Duration::from_millis(20));
        assert_eq!(stats.last(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn fps_from_average() {
        let mut stats = FrameStats::new(4);
        for _ in 0..4 {
            stats.record(Duration::from_millis(20));
        }
        assert!((stats.fps() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn zero_capacity_is_usable() {
        let mut stats = FrameStats::new(0);
        stats.record(Duration::from_millis(1));
        assert_eq!(stats.count(), 1);
    }
}
