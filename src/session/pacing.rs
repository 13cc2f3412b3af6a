use std::time::{Duration, Instant};

/// Elapsed-time-versus-interval frame cap.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    last_frame: Option<Instant>,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_frame: None }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_frame {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_frame {
            Some(last) => (last + self.interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Measures the next interval from when this frame actually ran, not from
    /// when it was due, so late ticks are never caught up and the achieved
    /// rate sits slightly under the target. That drift is accepted.
    pub fn mark(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }
}

/// Measured frame rate over fixed windows.
#[derive(Debug, Clone)]
pub struct FrameStats {
    window: Duration,
    window_start: Option<Instant>,
    frames: u32,
    fps: Option<f64>,
}

impl FrameStats {
    pub fn new(window: Duration) -> Self {
        Self { window, window_start: None, frames: 0, fps: None }
    }

    /// Counts a presented frame. Returns the new average whenever a window closes.
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return None;
        };

        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.window {
            return None;
        }

        let fps = self.frames as f64 / elapsed.as_secs_f64();
        self.fps = Some(fps);
        self.window_start = Some(now);
        self.frames = 0;
        Some(fps)
    }

    pub fn fps(&self) -> Option<f64> {
        self.fps
    }

    pub fn reset(&mut self) {
        self.window_start = None;
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_is_due_immediately() {
        let pacer = FramePacer::new(Duration::from_millis(16));
        let now = Instant::now();
        assert!(pacer.is_due(now));
        assert_eq!(pacer.time_until_due(now), Duration::ZERO);
    }

    #[test]
    fn waits_a_full_interval_after_a_frame() {
        let mut pacer = FramePacer::new(Duration::from_millis(10));
        let start = Instant::now();
        pacer.mark(start);

        assert!(!pacer.is_due(start + Duration::from_millis(9)));
        assert_eq!(pacer.time_until_due(start + Duration::from_millis(4)), Duration::from_millis(6));
        assert!(pacer.is_due(start + Duration::from_millis(10)));
        assert_eq!(pacer.time_until_due(start + Duration::from_millis(15)), Duration::ZERO);
    }

    #[test]
    fn interval_change_applies_to_next_frame() {
        let mut pacer = FramePacer::new(Duration::from_millis(10));
        let start = Instant::now();
        pacer.mark(start);
        pacer.set_interval(Duration::from_millis(30));
        assert!(!pacer.is_due(start + Duration::from_millis(20)));
        assert!(pacer.is_due(start + Duration::from_millis(30)));
    }

    #[test]
    fn stats_average_over_window() {
        let mut stats = FrameStats::new(Duration::from_millis(500));
        let start = Instant::now();
        let mut reported = Vec::new();

        for i in 0..=100 {
            if let Some(fps) = stats.record(start + Duration::from_millis(i * 10)) {
                reported.push(fps);
            }
        }

        assert_eq!(reported.len(), 2);
        assert!((reported[0] - 100.0).abs() < 1e-6);
        assert_eq!(stats.fps(), Some(reported[1]));
    }

    #[test]
    fn reset_discards_partial_window() {
        let mut stats = FrameStats::new(Duration::from_millis(500));
        let start = Instant::now();
        stats.record(start);
        stats.record(start + Duration::from_millis(100));
        stats.reset();
        assert_eq!(stats.record(start + Duration::from_millis(600)), None);
        assert_eq!(stats.fps(), None);
    }
}
