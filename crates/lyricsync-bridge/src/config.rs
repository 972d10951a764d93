use lyricsync_engine::{CorrectionsConfig, EngineConfig};
use serde::{Deserialize, Serialize};

/// Global application configuration.
///
/// Every field falls back to its default when missing, so a config file
/// written by an older version still loads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Matching profile and tuning of the alignment engine.
    pub engine: EngineConfig,
    /// Behavior of the learned corrections store.
    pub corrections: CorrectionsConfig,
}

#[cfg(test)]
mod tests {
    use lyricsync_engine::Profile;

    use super::*;

    #[test]
    fn default_uses_aggressive_profile() {
        let config = Config::default();
        assert_eq!(config.engine.profile, Profile::Aggressive);
        assert!(config.corrections.enabled);
    }
}
