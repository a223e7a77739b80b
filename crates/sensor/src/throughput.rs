use std::time::Duration;

const DEFAULT_SMOOTHING: f64 = 0.1;

/// Rolling frames-per-second estimate from per-frame processing time.
#[derive(Debug, Clone)]
pub struct Throughput {
    smoothing: f64,
    average_secs: Option<f64>,
    frames: u64,
}

impl Throughput {
    pub fn new() -> Self {
        Self::with_smoothing(DEFAULT_SMOOTHING)
    }

    /// `smoothing` is the weight of the newest sample, clamped to `(0, 1]`.
    pub fn with_smoothing(smoothing: f64) -> Self {
        let smoothing = if smoothing > 0.0 { smoothing.min(1.0) } else { DEFAULT_SMOOTHING };
        Self {
            smoothing,
            average_secs: None,
            frames: 0,
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        let sample = elapsed.as_secs_f64();
        self.average_secs = Some(match self.average_secs {
            Some(avg) => avg + self.smoothing * (sample - avg),
            None => sample,
        });
        self.frames += 1;
    }

    pub fn fps(&self) -> f64 {
        match self.average_secs {
            Some(avg) if avg > 0.0 => 1.0 / avg,
            _ => 0.0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for Throughput {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reports_zero() {
        let t = Throughput::new();
        assert_eq!(t.fps(), 0.0);
        assert_eq!(t.frames(), 0);
    }

    #[test]
    fn test_first_sample_seeds_average() {
        let mut t = Throughput::new();
        t.record(Duration::from_millis(20));
        assert!((t.fps() - 50.0).abs() < 1e-9);
        assert_eq!(t.frames(), 1);
    }

    #[test]
    fn test_converges_to_steady_rate() {
        let mut t = Throughput::new();
        t.record(Duration::from_millis(100));
        for _ in 0..200 {
            t.record(Duration::from_millis(10));
        }
        assert!((t.fps() - 100.0).abs() < 0.5, "fps = {}", t.fps());
        assert_eq!(t.frames(), 201);
    }

    #[test]
    fn test_single_spike_is_damped() {
        let mut t = Throughput::new();
        for _ in 0..50 {
            t.record(Duration::from_millis(10));
        }
        t.record(Duration::from_millis(110));
        // 0.9 * 10ms + 0.1 * 110ms = 20ms
        assert!((t.fps() - 50.0).abs() < 0.5, "fps = {}", t.fps());
    }

    #[test]
    fn test_zero_duration_frames() {
        let mut t = Throughput::with_smoothing(1.0);
        t.record(Duration::ZERO);
        assert_eq!(t.fps(), 0.0);
        assert_eq!(t.frames(), 1);
    }
}
