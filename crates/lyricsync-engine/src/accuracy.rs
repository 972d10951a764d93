use crate::{MatchOutcome, MatchRecord, similarity, tokenizer::Token};

/// Running totals behind the live accuracy figure.
///
/// Skipped slots are not counted as processed. A slot counts as correct when
/// it was matched, or when it was recorded as incorrect but the heard word
/// turns out to be close to the target anyway (the jump limiter and the
/// partial-match path both record such near misses).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    processed: u32,
    correct: u32,
    skipped: u32,
}

/// Similarity and confidence an incorrect slot needs to count as correct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recheck {
    pub similarity: f32,
    pub confidence: f32,
}

impl Accumulator {
    /// Adds `record` (stored for `target`) to the totals.
    pub fn apply(&mut self, record: &MatchRecord, target: &Token, recheck: Recheck) {
        let (processed, correct, skipped) = classify(record, target, recheck);
        self.processed += processed;
        self.correct += correct;
        self.skipped += skipped;
    }

    /// Removes a previously applied `record` from the totals.
    pub fn retract(&mut self, record: &MatchRecord, target: &Token, recheck: Recheck) {
        let (processed, correct, skipped) = classify(record, target, recheck);
        self.processed = self.processed.saturating_sub(processed);
        self.correct = self.correct.saturating_sub(correct);
        self.skipped = self.skipped.saturating_sub(skipped);
    }

    /// Rebuilds the totals from a full history.
    pub fn recompute(history: &[Option<MatchRecord>], reference: &[Token], recheck: Recheck) -> Self {
        let mut accumulator = Self::default();
        for (record, target) in history.iter().zip(reference) {
            if let Some(record) = record {
                accumulator.apply(record, target, recheck);
            }
        }

        accumulator
    }

    /// `correct / processed`, or 0 before anything was processed.
    pub fn accuracy(&self) -> f32 {
        if self.processed == 0 {
            return 0.0;
        }

        self.correct as f32 / self.processed as f32
    }

    pub fn processed(&self) -> u32 {
        self.processed
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }
}

/// Share of the sequence already behind the pointer.
pub fn progress(position: usize, len: usize) -> f32 {
    if len == 0 {
        return 0.0;
    }

    position as f32 / len as f32
}

/// Share of the passed tokens that were skipped.
pub fn skip_rate(skipped: u32, position: usize) -> f32 {
    if position == 0 {
        return 0.0;
    }

    skipped as f32 / position as f32
}

fn classify(record: &MatchRecord, target: &Token, recheck: Recheck) -> (u32, u32, u32) {
    match record.outcome {
        MatchOutcome::Skipped => (0, 0, 1),
        MatchOutcome::Correct => (1, 1, 0),
        MatchOutcome::TimedOut => (1, 0, 0),
        MatchOutcome::Incorrect => {
            let close_enough = record.detected.as_deref().is_some_and(|detected| {
                !detected.is_empty()
                    && record.confidence >= recheck.confidence
                    && similarity::similarity(detected, &target.normalized) >= recheck.similarity
            });
            (1, u32::from(close_enough), 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::tokenizer::tokenize;

    const RECHECK: Recheck = Recheck {
        similarity: 0.6,
        confidence: 0.3,
    };

    fn record(index: u32, detected: Option<&str>, confidence: f32, outcome: MatchOutcome) -> MatchRecord {
        MatchRecord {
            target_index: index,
            detected: detected.map(str::to_string),
            confidence,
            outcome,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn skipped_slots_are_not_processed() {
        let reference = tokenize("gel bana dogru");
        let history = vec![
            Some(record(0, Some("gel"), 0.9, MatchOutcome::Correct)),
            Some(record(1, None, 0.0, MatchOutcome::Skipped)),
            Some(record(2, Some("dogru"), 0.9, MatchOutcome::Correct)),
        ];

        let totals = Accumulator::recompute(&history, &reference, RECHECK);
        assert_eq!(totals.processed(), 2);
        assert_eq!(totals.skipped(), 1);
        assert_eq!(totals.accuracy(), 1.0);
    }

    #[test]
    fn near_miss_counts_as_correct() {
        let reference = tokenize("merhaba");
        let near = record(0, Some("merhab"), 0.8, MatchOutcome::Incorrect);
        let quiet = record(0, Some("merhab"), 0.1, MatchOutcome::Incorrect);
        let wrong = record(0, Some("xyz"), 0.9, MatchOutcome::Incorrect);

        let mut totals = Accumulator::default();
        totals.apply(&near, &reference[0], RECHECK);
        assert_eq!(totals.accuracy(), 1.0);

        totals.apply(&quiet, &reference[0], RECHECK);
        totals.apply(&wrong, &reference[0], RECHECK);
        assert_eq!(totals.processed(), 3);
        assert_eq!(totals.correct(), 1);
    }

    #[test]
    fn timed_out_slots_are_never_correct() {
        let reference = tokenize("gel");
        let mut totals = Accumulator::default();
        totals.apply(&record(0, None, 0.0, MatchOutcome::TimedOut), &reference[0], RECHECK);
        assert_eq!(totals.processed(), 1);
        assert_eq!(totals.accuracy(), 0.0);
    }

    #[test]
    fn retract_undoes_apply() {
        let reference = tokenize("gel");
        let correct = record(0, Some("gel"), 0.9, MatchOutcome::Correct);
        let mut totals = Accumulator::default();
        totals.apply(&correct, &reference[0], RECHECK);
        totals.retract(&correct, &reference[0], RECHECK);
        assert_eq!(totals, Accumulator::default());
    }

    #[test]
    fn empty_inputs_report_zero() {
        assert_eq!(Accumulator::default().accuracy(), 0.0);
        assert_eq!(progress(0, 0), 0.0);
        assert_eq!(progress(3, 3), 1.0);
        assert_eq!(skip_rate(1, 0), 0.0);
        assert_eq!(skip_rate(1, 4), 0.25);
    }
}
