//! The alignment state machine.
//!
//! [`LyricsAligner`] owns the reference sequence, the per-token match
//! history, the adaptive threshold and the single stall timer. It is not
//! internally synchronized: callers serialize `process_token`, timer firings
//! and lifecycle calls onto one execution context.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{
    Clock, MatchOutcome, MatchRecord, SystemClock,
    accuracy::{self, Accumulator, Recheck},
    config::EngineConfig,
    similarity::{self, Candidate},
    threshold::AdaptiveThreshold,
    tokenizer::{Normalizer, Token, tokenize},
};

/// Where the state machine ended up after the last call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentPhase {
    /// Waiting for the token at the pointer.
    Idle,
    /// The last word was an incomplete prefix of an upcoming token.
    PartialPending,
    /// The last call moved the pointer forward.
    Advanced,
    /// Every token has been passed; further words are ignored.
    Exhausted,
}

/// Notification emitted whenever the pointer moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionChanged {
    pub position: u32,
    pub accuracy: f32,
    pub progress: f32,
}

/// Result of feeding one word (or one stall timeout) to the aligner.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcomeEvent {
    /// The record written to the history by this call.
    pub record: MatchRecord,
    /// Present when the pointer moved.
    pub position_changed: Option<PositionChanged>,
}

/// Identifies one armed stall timer.
///
/// `generation` changes whenever the lyrics are set or the take is reset,
/// `sequence` changes whenever the timer is armed or cancelled. A firing
/// timer whose ticket no longer matches is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StallTicket {
    pub generation: u64,
    pub sequence: u64,
}

/// The stall timer the caller should currently be waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallTimer {
    pub ticket: StallTicket,
    pub deadline: Instant,
}

/// Mutable alignment bookkeeping for one take.
#[derive(Debug, Clone)]
pub struct AlignmentState {
    pub current_position: u32,
    /// One slot per reference token.
    pub history: Vec<Option<MatchRecord>>,
    pub last_match_time: Instant,
    pub last_token_seen_time: Instant,
    pub consecutive_no_match_count: u32,
    /// Normalized prefix heard for an upcoming token, if any.
    pub pending_partial_token: Option<String>,
}

impl AlignmentState {
    fn new(len: usize, now: Instant) -> Self {
        Self {
            current_position: 0,
            history: vec![None; len],
            last_match_time: now,
            last_token_seen_time: now,
            consecutive_no_match_count: 0,
            pending_partial_token: None,
        }
    }
}

/// Serializable state for resuming a session.
///
/// The reference sequence is rebuilt from `lyrics` rather than stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSnapshot {
    pub lyrics: String,
    pub current_position: u32,
    pub threshold: f32,
    pub history: Vec<Option<MatchRecord>>,
}

/// Errors raised when a snapshot does not fit the lyrics it carries.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The stored history does not have one slot per reference token.
    #[error("snapshot history has {found} slots, lyrics have {expected} tokens")]
    HistoryLength { expected: usize, found: usize },
    /// The stored pointer lies past the end of the sequence.
    #[error("snapshot position {position} is past the end of {len} tokens")]
    PositionOutOfRange { position: u32, len: usize },
    /// A history slot refers to a different token index.
    #[error("history slot {slot} refers to token {found}")]
    MisplacedRecord { slot: usize, found: u32 },
}

/// Tracks a singer's position in a fixed lyric sequence.
pub struct LyricsAligner<C: Clock = SystemClock> {
    config: EngineConfig,
    clock: C,
    normalizer: Normalizer,
    lyrics: String,
    reference: Vec<Token>,
    state: AlignmentState,
    threshold: AdaptiveThreshold,
    totals: Accumulator,
    phase: AlignmentPhase,
    generation: u64,
    timer_sequence: u64,
    stall_timer: Option<StallTimer>,
}

impl LyricsAligner<SystemClock> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> LyricsAligner<C> {
    /// Creates an aligner with no lyrics that reads time from `clock`.
    pub fn with_clock(config: EngineConfig, clock: C) -> Self {
        let now = clock.now();
        Self {
            threshold: AdaptiveThreshold::new(config.thresholds()),
            config,
            clock,
            normalizer: Normalizer::new(),
            lyrics: String::new(),
            reference: Vec::new(),
            state: AlignmentState::new(0, now),
            totals: Accumulator::default(),
            phase: AlignmentPhase::Exhausted,
            generation: 0,
            timer_sequence: 0,
            stall_timer: None,
        }
    }

    /// Loads a new song, discarding all alignment state of the previous one.
    pub fn set_lyrics(&mut self, text: &str) {
        self.lyrics = text.to_string();
        self.reference = tokenize(text);
        self.restart();
        log::info!(
            "Lyrics set: {} tokens, generation {}",
            self.reference.len(),
            self.generation
        );
    }

    /// Restarts the take: pointer, history and threshold return to their
    /// initial values, the reference sequence is kept.
    pub fn reset(&mut self) {
        self.restart();
        log::info!("Alignment reset, generation {}", self.generation);
    }

    /// Swaps the tuning. The threshold restarts at the new base, the pointer
    /// and history are kept and re-scored under the new recheck bounds.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
        self.threshold = AdaptiveThreshold::new(config.thresholds());
        self.totals = Accumulator::recompute(&self.state.history, &self.reference, self.recheck());
        log::info!("Engine profile set to {:?}", config.profile);
    }

    /// Feeds one recognizer word.
    ///
    /// Returns `None` when the word is ignored entirely (empty after
    /// normalization, or the sequence is exhausted); otherwise returns the
    /// record written to the history and, when the pointer moved, the
    /// position change.
    pub fn process_token(&mut self, detected: &str, confidence: f32) -> Option<MatchOutcomeEvent> {
        if self.is_exhausted() {
            self.cancel_stall_timer();
            self.phase = AlignmentPhase::Exhausted;
            return None;
        }

        let forms = self.normalizer.forms(detected).clone();
        if forms.normalized.is_empty() {
            log::debug!("Ignoring {detected:?}: empty after normalization");
            return None;
        }

        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let now = self.clock.now();
        let position = self.position();
        let threshold = self.threshold.current();
        let candidate =
            similarity::best_match(&forms, &self.reference, position, &self.config.alignment);

        log::debug!(
            "Heard {:?} at {position}/{} (target {:?}), confidence {confidence:.2}, threshold {threshold:.2}, candidate {candidate:?}",
            forms.normalized,
            self.len(),
            self.reference[position].normalized,
        );

        let event = match candidate {
            Some(candidate) if self.accepts(&candidate, confidence, threshold) => {
                self.accept(candidate, forms.normalized, confidence, now)
            }
            candidate => self.reject(candidate, forms.normalized, confidence, now),
        };

        Some(event)
    }

    /// Handles a firing stall timer.
    ///
    /// Forces the pointer past the current token only when the singer has
    /// been stuck: no match and no word heard for the whole stuck timeout,
    /// no partial word pending, and enough consecutive misses.
    pub fn on_stall_timeout(&mut self, ticket: StallTicket) -> Option<MatchOutcomeEvent> {
        if self.stall_timer.map(|timer| timer.ticket) != Some(ticket) {
            log::debug!("Ignoring stale stall timer {ticket:?}");
            return None;
        }
        self.stall_timer = None;

        if self.is_exhausted() {
            return None;
        }

        let now = self.clock.now();
        let timeout = self.config.alignment.stuck_timeout();
        let since_match = now.saturating_duration_since(self.state.last_match_time);
        let since_token = now.saturating_duration_since(self.state.last_token_seen_time);
        let stuck = since_match >= timeout
            && since_token >= timeout
            && self.state.pending_partial_token.is_none()
            && self.state.consecutive_no_match_count >= self.config.alignment.stall_no_match_count;

        if !stuck {
            log::debug!(
                "Stall timer fired but not stuck: {since_match:?} since match, {since_token:?} since last word, {} misses, partial {:?}",
                self.state.consecutive_no_match_count,
                self.state.pending_partial_token
            );
            return None;
        }

        let position = self.position();
        log::info!(
            "Stuck at {position} for {since_match:?} after {} misses, forcing advance",
            self.state.consecutive_no_match_count
        );

        let record = self.write_slot(position, None, 0.0, MatchOutcome::TimedOut, now);
        self.state.current_position += 1;
        self.state.last_match_time = now;
        self.state.consecutive_no_match_count = 0;
        self.state.pending_partial_token = None;
        self.phase = self.advanced_phase();

        Some(MatchOutcomeEvent {
            record,
            position_changed: Some(self.position_changed()),
        })
    }

    /// Steps the pointer back by one token and clears that slot.
    ///
    /// Used by manual click-to-correct flows. A no-op at position 0.
    pub fn undo_last(&mut self) -> Option<PositionChanged> {
        if self.state.current_position == 0 {
            return None;
        }

        let now = self.clock.now();
        self.state.current_position -= 1;
        let position = self.position();
        self.clear_slot(position);
        self.state.consecutive_no_match_count = 0;
        self.state.pending_partial_token = None;
        self.state.last_match_time = now;
        self.state.last_token_seen_time = now;
        self.cancel_stall_timer();
        self.phase = AlignmentPhase::Idle;
        log::debug!("Undo: pointer back to {position}");

        Some(self.position_changed())
    }

    /// Captures the resumable part of the session.
    pub fn snapshot(&self) -> AlignmentSnapshot {
        AlignmentSnapshot {
            lyrics: self.lyrics.clone(),
            current_position: self.state.current_position,
            threshold: self.threshold.current(),
            history: self.state.history.clone(),
        }
    }

    /// Resumes a session captured by [`LyricsAligner::snapshot`].
    ///
    /// On error the aligner is left with the snapshot's lyrics loaded and a
    /// fresh take.
    pub fn restore(&mut self, snapshot: AlignmentSnapshot) -> Result<(), SnapshotError> {
        self.set_lyrics(&snapshot.lyrics);

        let len = self.len();
        if snapshot.history.len() != len {
            return Err(SnapshotError::HistoryLength {
                expected: len,
                found: snapshot.history.len(),
            });
        }
        if snapshot.current_position as usize > len {
            return Err(SnapshotError::PositionOutOfRange {
                position: snapshot.current_position,
                len,
            });
        }
        for (slot, record) in snapshot.history.iter().enumerate() {
            if let Some(record) = record
                && record.target_index as usize != slot
            {
                return Err(SnapshotError::MisplacedRecord {
                    slot,
                    found: record.target_index,
                });
            }
        }

        self.state.current_position = snapshot.current_position;
        self.state.history = snapshot.history;
        self.threshold.restore(snapshot.threshold);
        self.totals = Accumulator::recompute(&self.state.history, &self.reference, self.recheck());
        self.phase = if self.is_exhausted() {
            AlignmentPhase::Exhausted
        } else {
            AlignmentPhase::Idle
        };
        log::info!("Session restored at {}/{}", self.position(), len);

        Ok(())
    }

    /// The stall timer the caller should be waiting on, if any.
    pub fn pending_stall_timer(&self) -> Option<StallTimer> {
        self.stall_timer
    }

    pub fn position(&self) -> usize {
        self.state.current_position as usize
    }

    pub fn len(&self) -> usize {
        self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.position() >= self.len()
    }

    pub fn phase(&self) -> AlignmentPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn lyrics(&self) -> &str {
        &self.lyrics
    }

    pub fn reference(&self) -> &[Token] {
        &self.reference
    }

    pub fn state(&self) -> &AlignmentState {
        &self.state
    }

    pub fn history(&self) -> &[Option<MatchRecord>] {
        &self.state.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current acceptance threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold.current()
    }

    pub fn pending_partial(&self) -> Option<&str> {
        self.state.pending_partial_token.as_deref()
    }

    pub fn consecutive_no_match_count(&self) -> u32 {
        self.state.consecutive_no_match_count
    }

    pub fn progress(&self) -> f32 {
        accuracy::progress(self.position(), self.len())
    }

    pub fn accuracy(&self) -> f32 {
        self.totals.accuracy()
    }

    pub fn skip_rate(&self) -> f32 {
        accuracy::skip_rate(self.totals.skipped(), self.position())
    }

    pub fn position_changed(&self) -> PositionChanged {
        PositionChanged {
            position: self.state.current_position,
            accuracy: self.accuracy(),
            progress: self.progress(),
        }
    }

    fn restart(&mut self) {
        let now = self.clock.now();
        self.generation += 1;
        self.state = AlignmentState::new(self.reference.len(), now);
        self.threshold.reset();
        self.totals = Accumulator::default();
        self.cancel_stall_timer();
        self.phase = if self.reference.is_empty() {
            AlignmentPhase::Exhausted
        } else {
            AlignmentPhase::Idle
        };
    }

    fn accepts(&self, candidate: &Candidate, confidence: f32, threshold: f32) -> bool {
        let alignment = &self.config.alignment;
        if candidate.is_prefix_only
            || candidate.similarity < threshold
            || confidence < alignment.min_match_confidence
        {
            return false;
        }

        candidate.index <= self.position() + 1 || candidate.similarity >= alignment.jump_similarity
    }

    fn accept(
        &mut self,
        candidate: Candidate,
        detected: String,
        confidence: f32,
        now: Instant,
    ) -> MatchOutcomeEvent {
        let position = self.position();
        let jump = candidate.index - position;

        self.state.last_match_time = now;
        self.state.last_token_seen_time = now;
        self.state.pending_partial_token = None;
        self.cancel_stall_timer();

        if jump > self.config.alignment.max_position_jump {
            log::debug!(
                "Rejecting jump of {jump} tokens to {:?}, stepping past {position} instead",
                self.reference[candidate.index].normalized
            );
            let record =
                self.write_slot(position, Some(detected), confidence, MatchOutcome::Incorrect, now);
            self.state.current_position += 1;
            self.threshold.record_outcome(confidence, false, now);
            self.phase = self.advanced_phase();

            return MatchOutcomeEvent {
                record,
                position_changed: Some(self.position_changed()),
            };
        }

        for skipped in position..candidate.index {
            if self.state.history[skipped].is_none() {
                self.write_slot(skipped, None, 0.0, MatchOutcome::Skipped, now);
            }
        }

        let record = self.write_slot(
            candidate.index,
            Some(detected),
            confidence,
            MatchOutcome::Correct,
            now,
        );
        self.state.current_position = candidate.index as u32 + 1;
        self.state.consecutive_no_match_count = 0;
        self.threshold.record_outcome(confidence, true, now);
        self.phase = self.advanced_phase();

        log::debug!(
            "Matched {:?} ({:?}, similarity {:.2}), pointer {position} -> {}",
            self.reference[candidate.index].normalized,
            candidate.kind,
            candidate.similarity,
            self.position()
        );

        MatchOutcomeEvent {
            record,
            position_changed: Some(self.position_changed()),
        }
    }

    fn reject(
        &mut self,
        candidate: Option<Candidate>,
        detected: String,
        confidence: f32,
        now: Instant,
    ) -> MatchOutcomeEvent {
        let position = self.position();
        let is_partial = candidate.is_some_and(|candidate| candidate.is_prefix_only);
        let record = self.write_slot(
            position,
            Some(detected.clone()),
            confidence,
            MatchOutcome::Incorrect,
            now,
        );
        self.threshold.record_outcome(confidence, false, now);

        if is_partial {
            log::debug!("Partial word {detected:?}, waiting for the rest");
            self.state.pending_partial_token = Some(detected);
            self.state.consecutive_no_match_count = 0;
            self.state.last_match_time = now;
            self.state.last_token_seen_time = now;
            self.cancel_stall_timer();
            self.phase = AlignmentPhase::PartialPending;
        } else {
            self.state.consecutive_no_match_count += 1;
            if confidence >= self.config.alignment.min_signal_confidence {
                self.state.pending_partial_token = None;
                self.state.last_token_seen_time = now;
                self.arm_stall_timer(now);
            } else {
                log::debug!("Low confidence {confidence:.2} for {detected:?}, treating as noise");
            }
            self.phase = if self.state.pending_partial_token.is_some() {
                AlignmentPhase::PartialPending
            } else {
                AlignmentPhase::Idle
            };
        }

        MatchOutcomeEvent {
            record,
            position_changed: None,
        }
    }

    fn advanced_phase(&self) -> AlignmentPhase {
        if self.is_exhausted() {
            AlignmentPhase::Exhausted
        } else {
            AlignmentPhase::Advanced
        }
    }

    fn recheck(&self) -> Recheck {
        Recheck {
            similarity: self.config.alignment.recheck_similarity,
            confidence: self.config.alignment.recheck_confidence,
        }
    }

    /// Stores a record at `slot`, keeping the accuracy totals in sync.
    fn write_slot(
        &mut self,
        slot: usize,
        detected: Option<String>,
        confidence: f32,
        outcome: MatchOutcome,
        now: Instant,
    ) -> MatchRecord {
        self.clear_slot(slot);
        let recheck = self.recheck();
        let record = MatchRecord {
            target_index: slot as u32,
            detected,
            confidence,
            outcome,
            timestamp: now,
        };
        self.totals.apply(&record, &self.reference[slot], recheck);
        self.state.history[slot] = Some(record.clone());
        record
    }

    fn clear_slot(&mut self, slot: usize) {
        if let Some(previous) = self.state.history[slot].take() {
            let recheck = self.recheck();
            self.totals.retract(&previous, &self.reference[slot], recheck);
        }
    }

    fn arm_stall_timer(&mut self, now: Instant) {
        self.timer_sequence += 1;
        self.stall_timer = Some(StallTimer {
            ticket: StallTicket {
                generation: self.generation,
                sequence: self.timer_sequence,
            },
            deadline: now + self.config.alignment.stuck_timeout(),
        });
    }

    fn cancel_stall_timer(&mut self) {
        if self.stall_timer.take().is_some() {
            self.timer_sequence += 1;
        }
    }
}
