use std::time::Duration;

/// Admits at most one frame per `1 / target_fps` of capture time.
///
/// The first frame after construction or [`reconfigure`](Self::reconfigure)
/// is always admitted. A non-positive or non-finite rate pauses admission
/// entirely. Timestamps that move backwards are rejected.
pub struct FrameRateLimiter {
    target_fps: f32,
    interval: Option<Duration>,
    last_admitted: Option<Duration>,
    last_seen: Option<Duration>,
}

impl FrameRateLimiter {
    pub fn new(target_fps: f32) -> Self {
        Self {
            target_fps,
            interval: interval_for(target_fps),
            last_admitted: None,
            last_seen: None,
        }
    }

    pub fn target_fps(&self) -> f32 {
        self.target_fps
    }

    /// Applies a new rate and forgets timing history.
    pub fn reconfigure(&mut self, target_fps: f32) {
        *self = Self::new(target_fps);
    }

    pub fn admit(&mut self, timestamp: Duration) -> bool {
        let Some(interval) = self.interval else {
            return false;
        };

        if let Some(prev) = self.last_seen {
            if timestamp < prev {
                log::debug!(
                    "Rejecting out-of-order timestamp {:?} (previous {:?})",
                    timestamp,
                    prev
                );
                return false;
            }
        }
        self.last_seen = Some(timestamp);

        let due = match self.last_admitted {
            None => true,
            Some(last) => timestamp - last >= interval,
        };
        if due {
            self.last_admitted = Some(timestamp);
        }
        due
    }
}

fn interval_for(target_fps: f32) -> Option<Duration> {
    if !target_fps.is_finite() || target_fps <= 0.0 {
        return None;
    }
    // Tiny positive rates overflow `Duration`; they still admit one frame.
    Some(Duration::try_from_secs_f64(1.0 / target_fps as f64).unwrap_or(Duration::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_first_frame_admitted_without_warmup() {
        let mut limiter = FrameRateLimiter::new(10.0);
        assert!(limiter.admit(at(5.0)));
    }

    #[test]
    fn test_frames_inside_interval_rejected() {
        let mut limiter = FrameRateLimiter::new(10.0);
        assert!(limiter.admit(at(0.0)));
        assert!(!limiter.admit(at(0.05)));
        assert!(!limiter.admit(at(0.099)));
        assert!(limiter.admit(at(0.1)));
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-5.0)]
    #[case::nan(f32::NAN)]
    #[case::infinite(f32::INFINITY)]
    fn test_non_positive_rate_admits_nothing(#[case] fps: f32) {
        let mut limiter = FrameRateLimiter::new(fps);
        let admitted = (0..100)
            .filter(|i| limiter.admit(at(*i as f64 * 0.01)))
            .count();
        assert_eq!(admitted, 0);
    }

    #[rstest]
    #[case::tiny(1e-25)]
    #[case::smallest_subnormal(f32::from_bits(1))]
    fn test_tiny_positive_rate_admits_first_frame_only(#[case] fps: f32) {
        let mut limiter = FrameRateLimiter::new(fps);
        assert!(limiter.admit(Duration::ZERO));
        assert!(!limiter.admit(at(3600.0)));
        assert!(!limiter.admit(Duration::from_secs(u64::MAX / 2)));
    }

    #[test]
    fn test_backwards_timestamp_rejected() {
        let mut limiter = FrameRateLimiter::new(1.0);
        assert!(limiter.admit(at(10.0)));
        assert!(!limiter.admit(at(3.0)));
        assert!(limiter.admit(at(11.0)));
    }

    #[test]
    fn test_backwards_timestamp_rejected_even_when_interval_elapsed() {
        let mut limiter = FrameRateLimiter::new(100.0);
        assert!(limiter.admit(at(0.0)));
        assert!(!limiter.admit(at(0.005)));
        assert!(!limiter.admit(at(0.001)));
    }

    #[test]
    fn test_reconfigure_admits_next_frame_immediately() {
        let mut limiter = FrameRateLimiter::new(1.0);
        assert!(limiter.admit(at(0.0)));
        assert!(!limiter.admit(at(0.1)));
        limiter.reconfigure(2.0);
        assert!(limiter.admit(at(0.2)));
        assert_eq!(limiter.target_fps(), 2.0);
    }

    #[test]
    fn test_resume_after_pause() {
        let mut limiter = FrameRateLimiter::new(0.0);
        assert!(!limiter.admit(at(0.0)));
        limiter.reconfigure(5.0);
        assert!(limiter.admit(at(0.1)));
    }

    #[rstest]
    #[case(1.0, 120, 60.0)]
    #[case(15.0, 30, 30.0)]
    #[case(7.5, 240, 60.0)]
    #[case(24.0, 1000, 240.0)]
    fn test_admissions_bounded_by_window(
        #[case] fps: f32,
        #[case] frames: usize,
        #[case] capture_fps: f64,
    ) {
        let mut limiter = FrameRateLimiter::new(fps);
        let stamps: Vec<Duration> = (0..frames).map(|i| at(i as f64 / capture_fps)).collect();
        let admitted: Vec<Duration> = stamps
            .iter()
            .copied()
            .filter(|t| limiter.admit(*t))
            .collect();

        // Every window [start, start + T] must respect ceil(T * R) + 1.
        let window = 0.5;
        for (i, start) in admitted.iter().enumerate() {
            let end = *start + at(window);
            let count = admitted[i..].iter().take_while(|t| **t <= end).count();
            let bound = (window * fps as f64).ceil() as usize + 1;
            assert!(count <= bound, "{count} admissions in window, bound {bound}");
        }
    }
}
