use std::{collections::VecDeque, time::Instant};

use crate::config::ThresholdConfig;

/// Number of most recent outcomes the accuracy trend is computed over.
const TREND_WINDOW: usize = 5;
/// The trend is ignored until at least this many outcomes are known.
const TREND_MIN_SAMPLES: usize = 3;
const LOW_ACCURACY: f32 = 0.4;
const HIGH_ACCURACY: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Outcome {
    confidence: f32,
    correct: bool,
    at: Instant,
}

/// Acceptance threshold that follows the singer's recent accuracy.
///
/// Poor recent accuracy lowers the bar a little at a time, consistently good
/// accuracy raises it, and anything in between snaps it back to the base.
/// The value never leaves `[min, max]`.
#[derive(Debug, Clone)]
pub struct AdaptiveThreshold {
    config: ThresholdConfig,
    current: f32,
    recent: VecDeque<Outcome>,
}

impl AdaptiveThreshold {
    pub fn new(config: ThresholdConfig) -> Self {
        let config = config.ordered();
        let current = config.base.clamp(config.min, config.max);
        Self {
            config,
            current,
            recent: VecDeque::with_capacity(config.window_size + 1),
        }
    }

    /// Current acceptance threshold.
    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Number of outcomes currently held in the rolling window.
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Records a match outcome observed at `now` and re-tunes the threshold.
    pub fn record_outcome(&mut self, confidence: f32, correct: bool, now: Instant) -> f32 {
        self.recent.push_back(Outcome {
            confidence,
            correct,
            at: now,
        });

        let window = self.config.window();
        self.recent
            .retain(|outcome| now.saturating_duration_since(outcome.at) < window);
        while self.recent.len() > self.config.window_size {
            self.recent.pop_front();
        }

        let trend_len = self.recent.len().min(TREND_WINDOW);
        if trend_len < TREND_MIN_SAMPLES {
            return self.current;
        }

        let correct_count = self
            .recent
            .iter()
            .rev()
            .take(trend_len)
            .filter(|outcome| outcome.correct)
            .count();
        let accuracy = correct_count as f32 / trend_len as f32;
        let mean_confidence = self
            .recent
            .iter()
            .rev()
            .take(trend_len)
            .map(|outcome| outcome.confidence)
            .sum::<f32>()
            / trend_len as f32;

        let previous = self.current;
        self.current = if accuracy < LOW_ACCURACY {
            (self.current - self.config.step_down).max(self.config.min)
        } else if accuracy > HIGH_ACCURACY {
            (self.current + self.config.step_up).min(self.config.max)
        } else {
            self.config.base
        }
        .clamp(self.config.min, self.config.max);

        if previous != self.current {
            log::debug!(
                "Threshold moved {previous:.2} -> {:.2} (recent accuracy {accuracy:.2}, mean confidence {mean_confidence:.2})",
                self.current
            );
        }

        self.current
    }

    /// Clears the outcome window and returns to the base threshold.
    pub fn reset(&mut self) {
        self.recent.clear();
        self.current = self.config.base.clamp(self.config.min, self.config.max);
    }

    /// Restores a persisted threshold value, clamped into the bounds.
    pub fn restore(&mut self, current: f32) {
        self.recent.clear();
        self.current = if current.is_finite() {
            current.clamp(self.config.min, self.config.max)
        } else {
            self.config.base
        };
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Profile;

    fn aggressive() -> AdaptiveThreshold {
        AdaptiveThreshold::new(ThresholdConfig::for_profile(Profile::Aggressive))
    }

    #[test]
    fn starts_at_base() {
        let threshold = aggressive();
        assert_eq!(threshold.current(), 0.45);
    }

    #[test]
    fn needs_three_outcomes_before_moving() {
        let mut threshold = aggressive();
        let now = Instant::now();
        threshold.record_outcome(0.9, false, now);
        threshold.record_outcome(0.9, false, now);
        assert_eq!(threshold.current(), 0.45);

        threshold.record_outcome(0.9, false, now);
        assert!(threshold.current() < 0.45);
    }

    #[test]
    fn repeated_misses_stop_at_min() {
        let mut threshold = aggressive();
        let now = Instant::now();
        for _ in 0..50 {
            threshold.record_outcome(0.9, false, now);
            assert!(threshold.current() >= threshold.config().min);
        }
        assert_eq!(threshold.current(), 0.35);
    }

    #[test]
    fn repeated_hits_stop_at_max() {
        let mut threshold = aggressive();
        let now = Instant::now();
        for _ in 0..100 {
            threshold.record_outcome(0.9, true, now);
            assert!(threshold.current() <= threshold.config().max);
        }
        assert!((threshold.current() - 0.65).abs() < 1e-6);
    }

    #[test]
    fn mixed_accuracy_returns_to_base() {
        let mut threshold = aggressive();
        let now = Instant::now();
        for _ in 0..5 {
            threshold.record_outcome(0.9, true, now);
        }
        assert!(threshold.current() > 0.45);

        // 3 of the last 5 correct: 0.6 sits between the bands
        threshold.record_outcome(0.9, false, now);
        threshold.record_outcome(0.9, false, now);
        assert_eq!(threshold.current(), 0.45);
    }

    #[test]
    fn window_is_bounded_by_size_and_age() {
        let mut threshold = aggressive();
        let start = Instant::now();
        for _ in 0..25 {
            threshold.record_outcome(0.9, true, start);
        }
        assert_eq!(threshold.recent_len(), 10);

        threshold.record_outcome(0.9, true, start + Duration::from_secs(31));
        assert_eq!(threshold.recent_len(), 1);
    }

    #[test]
    fn reset_restores_base() {
        let mut threshold = aggressive();
        let now = Instant::now();
        for _ in 0..10 {
            threshold.record_outcome(0.2, false, now);
        }
        threshold.reset();
        assert_eq!(threshold.current(), 0.45);
        assert_eq!(threshold.recent_len(), 0);
    }

    #[test]
    fn restore_clamps_into_bounds() {
        let mut threshold = aggressive();
        threshold.restore(0.9);
        assert_eq!(threshold.current(), 0.65);
        threshold.restore(f32::NAN);
        assert_eq!(threshold.current(), 0.45);
    }
}
