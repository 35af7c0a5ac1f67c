use crate::clock::{Clock, SystemClock};
use crate::stats::FrameStats;
use std::time::Duration;
use workshop_common::PacerConfig;

/// What one call to [`FramePacer::pace`] measured and decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaceReport {
    /// Time spent in the iteration before pacing.
    pub work_time: Duration,
    /// Sleep requested from the clock. Zero when the frame overran.
    pub sleep_time: Duration,
    /// Whole iteration, including the sleep.
    pub frame_time: Duration,
    /// Filtered correction carried into the next frame, in seconds.
    pub sleep_adjust: f64,
}

/// Holds a loop to a fixed period with a feedback-corrected sleep.
///
/// Call [`pace`](Self::pace) once at the end of every iteration. The timing
/// window of an iteration starts where the previous `pace` returned (or at
/// construction / [`restart`](Self::restart)), so everything the loop does
/// between two calls counts as work.
///
/// Sleep primitives routinely wake late. The pacer keeps a running
/// correction, `sleep_adjust`, updated as an exponential moving average of
/// `target - frame_time`, and adds it to the next sleep request.
#[derive(Debug)]
pub struct FramePacer<C = SystemClock> {
    clock: C,
    target: Duration,
    smoothing: f64,
    /// Signed correction in seconds.
    sleep_adjust: f64,
    window_start: Duration,
    stats: FrameStats,
}

impl FramePacer<SystemClock> {
    /// Pacer driven by the wall clock.
    pub fn new(config: &PacerConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> FramePacer<C> {
    pub fn with_clock(config: &PacerConfig, clock: C) -> Self {
        let window_start = clock.now();
        tracing::debug!(
            target_fps = config.target_fps,
            smoothing = config.smoothing,
            "frame pacer created"
        );
        Self {
            clock,
            target: config.target_period(),
            smoothing: config.smoothing,
            sleep_adjust: 0.0,
            window_start,
            stats: FrameStats::default(),
        }
    }

    pub fn target_period(&self) -> Duration {
        self.target
    }

    /// Current filtered correction, in seconds. Negative means the loop has
    /// been running long and sleeps are being shortened.
    pub fn sleep_adjust(&self) -> f64 {
        self.sleep_adjust
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Start a fresh timing window now, e.g. after the window was hidden.
    /// The filtered correction is kept.
    pub fn restart(&mut self) {
        self.window_start = self.clock.now();
    }

    /// End the current iteration: sleep off the rest of the target period,
    /// update the correction, and open the next timing window.
    pub fn pace(&mut self) -> PaceReport {
        let _span = tracing::info_span!("pace").entered();
        let target = self.target.as_secs_f64();

        let work_time = self.clock.now().saturating_sub(self.window_start);
        let requested = target - work_time.as_secs_f64() + self.sleep_adjust;
        let sleep_time = if requested > 0.0 {
            Duration::try_from_secs_f64(requested).unwrap_or(self.target)
        } else {
            Duration::ZERO
        };
        if !sleep_time.is_zero() {
            self.clock.sleep(sleep_time);
        }

        let frame_end = self.clock.now();
        let frame_time = frame_end.saturating_sub(self.window_start);
        self.sleep_adjust = self.smoothing * self.sleep_adjust
            + (1.0 - self.smoothing) * (target - frame_time.as_secs_f64());
        self.window_start = frame_end;
        self.stats.record(frame_time);

        tracing::trace!(
            work_us = work_time.as_micros() as u64,
            sleep_us = sleep_time.as_micros() as u64,
            frame_us = frame_time.as_micros() as u64,
            adjust_us = self.sleep_adjust * 1e6,
            "paced frame"
        );

        PaceReport {
            work_time,
            sleep_time,
            frame_time,
            sleep_adjust: self.sleep_adjust,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn pacer(overshoot: Duration) -> FramePacer<ManualClock> {
        FramePacer::with_clock(
            &PacerConfig::default(),
            ManualClock::with_overshoot(overshoot),
        )
    }

    fn run(pacer: &mut FramePacer<ManualClock>, work: Duration, frames: usize) -> Vec<PaceReport> {
        (0..frames)
            .map(|_| {
                pacer.clock_mut().advance(work);
                pacer.pace()
            })
            .collect()
    }

    fn mean_frame_secs(reports: &[PaceReport]) -> f64 {
        reports
            .iter()
            .map(|r| r.frame_time.as_secs_f64())
            .sum::<f64>()
            / reports.len() as f64
    }

    #[test]
    fn starts_with_no_correction() {
        let p = pacer(Duration::ZERO);
        assert_eq!(p.sleep_adjust(), 0.0);
        assert!((p.target_period().as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn sixty_fps_with_ten_ms_of_work() {
        let mut p = pacer(Duration::ZERO);
        let reports = run(&mut p, Duration::from_millis(10), 100);
        let last = reports.last().unwrap();

        let expected_sleep = 1.0 / 60.0 - 0.010;
        assert!((last.sleep_time.as_secs_f64() - expected_sleep).abs() < 1e-6);
        assert!((last.frame_time.as_secs_f64() - 1.0 / 60.0).abs() < 0.5e-3);
        assert_eq!(last.work_time, Duration::from_millis(10));
    }

    #[test]
    fn steady_state_within_half_ms_despite_late_wakeups() {
        let mut p = pacer(Duration::from_micros(500));
        let reports = run(&mut p, Duration::from_millis(10), 100);
        for r in &reports[90..] {
            assert!((r.frame_time.as_secs_f64() - 1.0 / 60.0).abs() < 0.5e-3);
        }
    }

    #[test]
    fn converges_to_target_period() {
        let target = 1.0 / 60.0;
        for work_ms in [0, 2, 8, 15] {
            let mut p = pacer(Duration::from_micros(200));
            let reports = run(&mut p, Duration::from_millis(work_ms), 60);
            let mean = mean_frame_secs(&reports[50..]);
            assert!(
                (mean - target).abs() / target < 0.01,
                "work {work_ms}ms: mean frame {mean}"
            );
        }
    }

    #[test]
    fn correction_beats_plain_sleep_under_overshoot() {
        let overshoot = Duration::from_micros(300);
        let mut p = pacer(overshoot);
        let reports = run(&mut p, Duration::from_millis(5), 80);
        let error = mean_frame_secs(&reports[70..]) - 1.0 / 60.0;
        assert!(error < overshoot.as_secs_f64());
        assert!(p.sleep_adjust() < 0.0);
    }

    #[test]
    fn overrun_frame_does_not_sleep() {
        let mut p = pacer(Duration::ZERO);
        p.clock_mut().advance(Duration::from_millis(25));
        let report = p.pace();
        assert_eq!(report.sleep_time, Duration::ZERO);
        assert_eq!(report.frame_time, Duration::from_millis(25));
        assert!(p.clock().sleeps().is_empty());
        assert!(report.sleep_adjust < 0.0);
    }

    #[test]
    fn sleep_requests_are_always_positive() {
        let mut p = pacer(Duration::from_micros(150));
        let pattern = [3u64, 40, 12, 16, 17, 1, 90, 0, 9, 22];
        for i in 0..200 {
            let work = Duration::from_millis(pattern[i % pattern.len()]);
            let adjust_before = p.sleep_adjust();
            p.clock_mut().advance(work);
            let report = p.pace();
            if 1.0 / 60.0 - work.as_secs_f64() + adjust_before <= 0.0 {
                assert_eq!(report.sleep_time, Duration::ZERO);
            }
        }
        assert!(!p.clock().sleeps().is_empty());
        assert!(p.clock().sleeps().iter().all(|s| !s.is_zero()));
    }

    #[test]
    fn recovers_after_a_spike() {
        let mut p = pacer(Duration::ZERO);
        run(&mut p, Duration::from_millis(10), 20);
        p.clock_mut().advance(Duration::from_millis(40));
        p.pace();
        let reports = run(&mut p, Duration::from_millis(10), 60);
        let mean = mean_frame_secs(&reports[50..]);
        assert!((mean - 1.0 / 60.0).abs() / (1.0 / 60.0) < 0.01);
    }

    #[test]
    fn restart_excludes_stall_from_work_time() {
        let mut p = pacer(Duration::ZERO);
        p.clock_mut().advance(Duration::from_secs(2));
        p.restart();
        p.clock_mut().advance(Duration::from_millis(4));
        let report = p.pace();
        assert_eq!(report.work_time, Duration::from_millis(4));
    }

    #[test]
    fn window_starts_after_previous_sleep() {
        let mut p = pacer(Duration::ZERO);
        run(&mut p, Duration::from_millis(10), 3);
        p.clock_mut().advance(Duration::from_millis(7));
        let report = p.pace();
        assert_eq!(report.work_time, Duration::from_millis(7));
    }

    #[test]
    fn unusable_rate_paces_at_default_period() {
        for fps in [0.0, -30.0, 1.0e-30] {
            let config = PacerConfig {
                target_fps: fps,
                ..PacerConfig::default()
            };
            let mut p = FramePacer::with_clock(&config, ManualClock::new());
            assert_eq!(p.target_period(), PacerConfig::default().target_period());
            p.clock_mut().advance(Duration::from_millis(4));
            let report = p.pace();
            let error = report.frame_time.as_secs_f64() - p.target_period().as_secs_f64();
            assert!(error.abs() < 1e-8, "fps = {fps}");
        }
    }

    #[test]
    fn stats_track_frames() {
        let mut p = pacer(Duration::ZERO);
        run(&mut p, Duration::from_millis(10), 30);
        assert_eq!(p.stats().count(), 30);
        assert!((p.stats().fps() - 60.0).abs() < 0.5);
    }

    #[test]
    fn custom_rate_and_smoothing() {
        let config = PacerConfig {
            target_fps: 30.0,
            smoothing: 0.5,
        };
        let mut p = FramePacer::with_clock(&config, ManualClock::new());
        p.clock_mut().advance(Duration::from_millis(50));
        let report = p.pace();
        let expected = 0.5 * (1.0 / 30.0 - 0.050);
        assert!((report.sleep_adjust - expected).abs() < 1e-9);
    }
}
