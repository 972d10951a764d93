//! Real-time lyrics alignment primitives.
//!
//! This crate tracks a singer's position inside a fixed reference lyric
//! sequence while a speech recognizer streams `(word, confidence)` guesses.
//! It tolerates recognizer noise, skipped words, restarted words and
//! silence, and it never blocks: every call returns synchronously with at
//! most one event.
//!
//! The stall timer is exposed as data ([`StallTimer`]) instead of being
//! scheduled internally, so the caller decides how to wait for it (see the
//! backend crate for a tokio driver).

pub mod accuracy;
pub mod aligner;
pub mod config;
pub mod corrections;
pub mod similarity;
pub mod threshold;
pub mod tokenizer;

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

pub use crate::aligner::{
    AlignmentPhase, AlignmentSnapshot, AlignmentState, LyricsAligner, MatchOutcomeEvent,
    PositionChanged, SnapshotError, StallTicket, StallTimer,
};
pub use crate::config::{AlignmentConfig, EngineConfig, Profile, ThresholdConfig};
pub use crate::corrections::{Correction, CorrectionStore, CorrectionsConfig};
pub use crate::tokenizer::{Token, tokenize};

/// Outcome stored for a single reference token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    /// The singer produced the token (or something close enough).
    Correct,
    /// Something was heard at this position but it did not match.
    Incorrect,
    /// The singer jumped past this token to a later one.
    Skipped,
    /// The stall timer forced the pointer past this token.
    TimedOut,
}

/// One slot of the match history, keyed by the reference token index.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchRecord {
    pub target_index: u32,
    /// Normalized recognizer word, `None` for skipped and timed out slots.
    pub detected: Option<String>,
    pub confidence: f32,
    pub outcome: MatchOutcome,
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

/// Source of the current time for the aligner.
///
/// Every timing decision (stall detection, threshold window eviction) goes
/// through this trait so callers can substitute a runtime clock or a manual
/// clock in tests.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
