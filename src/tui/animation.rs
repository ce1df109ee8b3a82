use std::time::{Duration, Instant};

/// Bars hold at zero for this long after a result arrives.
pub const BAR_DELAY: Duration = Duration::from_millis(50);
pub const BAR_DURATION: Duration = Duration::from_millis(600);

/// Ease-out transition of one similar-case bar from 0 to its target width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarTween {
    target: f64,
    started: Instant,
}

impl BarTween {
    pub fn new(target_percent: u16, started: Instant) -> Self {
        Self {
            target: f64::from(target_percent.min(100)),
            started,
        }
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Width in percent at `now`.
    pub fn value_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed <= BAR_DELAY {
            return 0.0;
        }
        let t = ((elapsed - BAR_DELAY).as_secs_f64() / BAR_DURATION.as_secs_f64()).min(1.0);
        // cubic ease-out
        let eased = 1.0 - (1.0 - t).powi(3);
        self.target * eased
    }

    pub fn is_done(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= BAR_DELAY + BAR_DURATION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_zero_during_delay() {
        let t0 = Instant::now();
        let tween = BarTween::new(40, t0);
        assert_eq!(tween.value_at(t0), 0.0);
        assert_eq!(tween.value_at(t0 + Duration::from_millis(30)), 0.0);
        assert_eq!(tween.value_at(t0 + BAR_DELAY), 0.0);
        assert!(!tween.is_done(t0 + BAR_DELAY));
    }

    #[test]
    fn eases_monotonically_to_target() {
        let t0 = Instant::now();
        let tween = BarTween::new(40, t0);
        let mut prev = 0.0;
        for ms in (0..=800).step_by(10) {
            let v = tween.value_at(t0 + Duration::from_millis(ms));
            assert!(v >= prev, "width went backwards at {ms}ms: {v} < {prev}");
            assert!(v <= 40.0);
            prev = v;
        }
        assert_eq!(tween.value_at(t0 + BAR_DELAY + BAR_DURATION), 40.0);
        assert!(tween.is_done(t0 + Duration::from_millis(650)));
    }

    #[test]
    fn ease_out_front_loads_progress() {
        let t0 = Instant::now();
        let tween = BarTween::new(100, t0);
        let halfway = tween.value_at(t0 + BAR_DELAY + BAR_DURATION / 2);
        assert!(halfway > 50.0);
    }

    #[test]
    fn target_is_clamped() {
        let tween = BarTween::new(250, Instant::now());
        assert_eq!(tween.target(), 100.0);
    }
}
