use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Named tuning preset for the acceptance threshold.
///
/// Noisy handheld recognizers need a forgiving bar, while desktop
/// recognizers with good microphones can afford a stricter one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Low, forgiving thresholds. Default value.
    #[default]
    Aggressive,
    /// Higher thresholds for clean input.
    Conservative,
}

/// Bounds and step sizes for the adaptive acceptance threshold.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Value the threshold starts at and returns to on mixed accuracy.
    pub base: f32,
    /// Lower bound the threshold can never go below.
    pub min: f32,
    /// Upper bound the threshold can never go above.
    pub max: f32,
    /// Amount subtracted when recent accuracy is poor.
    pub step_down: f32,
    /// Amount added when recent accuracy is high.
    pub step_up: f32,
    /// Maximum number of outcomes kept in the rolling window.
    pub window_size: usize,
    /// Outcomes older than this are evicted from the window, in milliseconds.
    pub window_milliseconds: u64,
}

impl ThresholdConfig {
    pub fn for_profile(profile: Profile) -> Self {
        let (base, min, max) = match profile {
            Profile::Aggressive => (0.45, 0.35, 0.65),
            Profile::Conservative => (0.65, 0.50, 0.75),
        };

        Self {
            base,
            min,
            max,
            step_down: 0.02,
            step_up: 0.01,
            window_size: 10,
            window_milliseconds: 30_000,
        }
    }

    /// Returns a copy with `min <= max` and `base` inside the bounds, so a
    /// hand-edited config file cannot break the threshold invariant.
    pub fn ordered(self) -> Self {
        self.ordered_or(Self::default())
    }

    /// Like [`ThresholdConfig::ordered`], taking any non-finite value from
    /// `fallback` first.
    pub fn ordered_or(mut self, fallback: Self) -> Self {
        for (value, preset) in [
            (&mut self.base, fallback.base),
            (&mut self.min, fallback.min),
            (&mut self.max, fallback.max),
            (&mut self.step_down, fallback.step_down),
            (&mut self.step_up, fallback.step_up),
        ] {
            if !value.is_finite() {
                *value = preset;
            }
        }

        if self.min > self.max {
            std::mem::swap(&mut self.min, &mut self.max);
        }
        self.base = self.base.clamp(self.min, self.max);
        self.window_size = self.window_size.max(1);
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_milliseconds)
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}

/// Window sizes, limits and confidence floors used by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Number of upcoming reference tokens searched on every event.
    pub lookahead_range: usize,
    /// How many tokens past the lookahead window the predictive tier checks.
    pub predictive_range: usize,
    /// Largest accepted distance between the pointer and a matched token.
    pub max_position_jump: usize,
    /// Silence required before the stall timer may force an advance, in
    /// milliseconds.
    pub stuck_timeout_milliseconds: u64,
    /// Consecutive misses required before the stall timer may force an advance.
    pub stall_no_match_count: u32,
    /// Recognizer confidence a word needs before it can be accepted.
    pub min_match_confidence: f32,
    /// Below this confidence a word is treated as noise and never arms the
    /// stall timer.
    pub min_signal_confidence: f32,
    /// Similarity a match needs when it skips over at least one token.
    pub jump_similarity: f32,
    /// Minimum share of the target a prefix has to cover to count as a word
    /// still being spoken.
    pub partial_prefix_ratio: f32,
    /// Similarity the accuracy recheck needs to count an incorrect slot.
    pub recheck_similarity: f32,
    /// Confidence the accuracy recheck needs to count an incorrect slot.
    pub recheck_confidence: f32,
}

impl AlignmentConfig {
    pub fn stuck_timeout(&self) -> Duration {
        Duration::from_millis(self.stuck_timeout_milliseconds)
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            lookahead_range: 8,
            predictive_range: 3,
            max_position_jump: 4,
            stuck_timeout_milliseconds: 15_000,
            stall_no_match_count: 5,
            min_match_confidence: 0.25,
            min_signal_confidence: 0.30,
            jump_similarity: 0.80,
            partial_prefix_ratio: 0.30,
            recheck_similarity: 0.60,
            recheck_confidence: 0.30,
        }
    }
}

/// Complete engine configuration, passed in at construction.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Preset the threshold bounds are taken from.
    pub profile: Profile,
    /// Explicit threshold tuning. Overrides the profile preset when set.
    pub threshold: Option<ThresholdConfig>,
    pub alignment: AlignmentConfig,
}

impl EngineConfig {
    /// Builds the preset configuration for `profile`.
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            profile,
            threshold: None,
            alignment: AlignmentConfig::default(),
        }
    }

    /// Threshold tuning in effect: the explicit override, or the preset of
    /// the selected profile.
    pub fn thresholds(&self) -> ThresholdConfig {
        let preset = ThresholdConfig::for_profile(self.profile);
        match self.threshold {
            Some(threshold) => threshold.ordered_or(preset),
            None => preset,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_keep_base_inside_bounds() {
        for profile in [Profile::Aggressive, Profile::Conservative] {
            let threshold = ThresholdConfig::for_profile(profile);
            assert!(threshold.min <= threshold.base && threshold.base <= threshold.max);
        }
    }

    #[test]
    fn conservative_profile_is_stricter() {
        let aggressive = EngineConfig::for_profile(Profile::Aggressive);
        let conservative = EngineConfig::for_profile(Profile::Conservative);
        assert!(conservative.thresholds().base > aggressive.thresholds().base);
        assert_eq!(conservative.thresholds().min, 0.50);
        assert_eq!(conservative.thresholds().max, 0.75);
    }

    #[test]
    fn non_finite_bounds_fall_back_to_the_profile_preset() {
        let config = EngineConfig {
            threshold: Some(ThresholdConfig {
                base: f32::INFINITY,
                min: f32::NAN,
                ..ThresholdConfig::for_profile(Profile::Conservative)
            }),
            ..EngineConfig::for_profile(Profile::Conservative)
        };

        let thresholds = config.thresholds();
        assert_eq!(thresholds.min, 0.50);
        assert_eq!(thresholds.base, 0.65);
        assert_eq!(thresholds.max, 0.75);

        let ordered = ThresholdConfig {
            max: f32::NAN,
            ..ThresholdConfig::default()
        }
        .ordered();
        assert_eq!(ordered.max, 0.65);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "alignment": { "lookahead_range": 6 } }"#)
                .expect("valid config");
        assert_eq!(config.alignment.lookahead_range, 6);
        assert_eq!(config.alignment.max_position_jump, 4);
        assert_eq!(config.profile, Profile::Aggressive);
    }

    #[test]
    fn profile_alone_selects_its_preset() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "profile": "conservative" }"#).expect("valid config");
        assert_eq!(config.thresholds().base, 0.65);

        let overridden: EngineConfig = serde_json::from_str(
            r#"{ "profile": "conservative", "threshold": { "base": 0.55 } }"#,
        )
        .expect("valid config");
        assert_eq!(overridden.thresholds().base, 0.55);
        assert_eq!(overridden.thresholds().min, 0.35);
    }
}
