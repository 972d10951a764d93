//! Cascade of word matchers, cheapest first.
//!
//! Each tier scores a recognizer word against the reference tokens in the
//! lookahead window. The first tier that produces any hit decides the
//! candidate; later tiers are never evaluated for that word.

use crate::config::AlignmentConfig;
use crate::tokenizer::{Token, WordForms};

/// Fuzzy edit-distance ratios must be strictly above this to count.
const FUZZY_MIN_RATIO: f32 = 0.70;
/// Phonetic near-misses need at least this ratio besides distance <= 1.
const PHONETIC_MIN_RATIO: f32 = 0.80;
/// Similarity reported by the predictive lookahead tier.
const PREDICTIVE_SIMILARITY: f32 = 0.80;
/// Substring hits score between these two values.
const SUBSTRING_MIN_SIMILARITY: f32 = 0.60;
const SUBSTRING_MAX_SIMILARITY: f32 = 0.85;
/// Shortest string the substring tier accepts as the contained side.
const SUBSTRING_MIN_CHARS: usize = 2;

/// Which tier of the cascade produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    Phonetic,
    Fuzzy,
    Substring,
    /// Exact hit just past the lookahead window, produced when the
    /// recognizer lags behind the singer.
    Predictive,
}

/// Best reference token found for a recognizer word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Absolute index into the reference sequence.
    pub index: usize,
    pub similarity: f32,
    pub kind: MatchKind,
    /// The word is an incomplete prefix of the candidate: the singer is
    /// probably still in the middle of it.
    pub is_prefix_only: bool,
}

/// Searches `reference[start..start + lookahead_range]` for the best match
/// of `detected`, falling back to the predictive tier just past the window.
pub fn best_match(
    detected: &WordForms,
    reference: &[Token],
    start: usize,
    config: &AlignmentConfig,
) -> Option<Candidate> {
    if detected.normalized.is_empty() || start >= reference.len() {
        return None;
    }

    let end = reference.len().min(start + config.lookahead_range);
    let window = &reference[start..end];

    let tiers: [(MatchKind, fn(&WordForms, &Token) -> Option<f32>); 4] = [
        (MatchKind::Exact, exact_score),
        (MatchKind::Phonetic, phonetic_score),
        (MatchKind::Fuzzy, fuzzy_score),
        (MatchKind::Substring, substring_score),
    ];

    for (kind, score) in tiers {
        if let Some((offset, similarity)) = best_in_window(window, |token| score(detected, token)) {
            let index = start + offset;
            return Some(Candidate {
                index,
                similarity,
                kind,
                is_prefix_only: is_prefix_only(
                    &detected.normalized,
                    &reference[index].normalized,
                    config.partial_prefix_ratio,
                ),
            });
        }
    }

    let predictive_end = reference.len().min(end + config.predictive_range);
    reference[end..predictive_end]
        .iter()
        .position(|token| token.normalized == detected.normalized)
        .map(|offset| Candidate {
            index: end + offset,
            similarity: PREDICTIVE_SIMILARITY,
            kind: MatchKind::Predictive,
            is_prefix_only: false,
        })
}

/// Scores two normalized words with the same tiers as [`best_match`],
/// returning 0 when none of them applies.
pub fn similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let detected = WordForms::of(a);
    let target = WordForms::of(b);
    let token = Token {
        index: 0,
        raw: b.to_string(),
        normalized: target.normalized,
        phonetic: target.phonetic,
    };

    exact_score(&detected, &token)
        .or_else(|| phonetic_score(&detected, &token))
        .or_else(|| fuzzy_score(&detected, &token))
        .or_else(|| substring_score(&detected, &token))
        .unwrap_or(0.0)
}

/// `detected` is a strict, non-empty prefix of `target` covering at least
/// `min_ratio` of it.
pub fn is_prefix_only(detected: &str, target: &str, min_ratio: f32) -> bool {
    if detected.is_empty() || detected.len() >= target.len() || !target.starts_with(detected) {
        return false;
    }

    let ratio = char_len(detected) as f32 / char_len(target) as f32;
    ratio >= min_ratio && ratio < 1.0
}

/// Highest scoring token in `window`; ties go to the nearest one.
fn best_in_window(window: &[Token], score: impl Fn(&Token) -> Option<f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (offset, token) in window.iter().enumerate() {
        let Some(similarity) = score(token) else {
            continue;
        };

        if best.is_none_or(|(_, current)| similarity > current) {
            best = Some((offset, similarity));
        }
    }

    best
}

fn exact_score(detected: &WordForms, token: &Token) -> Option<f32> {
    (detected.normalized == token.normalized).then_some(1.0)
}

fn phonetic_score(detected: &WordForms, token: &Token) -> Option<f32> {
    if detected.phonetic.is_empty() || token.phonetic.is_empty() {
        return None;
    }

    let distance = strsim::levenshtein(&detected.phonetic, &token.phonetic);
    let ratio = edit_ratio(distance, &detected.phonetic, &token.phonetic);
    (distance == 0 || (distance <= 1 && ratio >= PHONETIC_MIN_RATIO)).then_some(ratio)
}

fn fuzzy_score(detected: &WordForms, token: &Token) -> Option<f32> {
    let distance = strsim::levenshtein(&detected.normalized, &token.normalized);
    let ratio = edit_ratio(distance, &detected.normalized, &token.normalized);
    (ratio > FUZZY_MIN_RATIO).then_some(ratio)
}

fn substring_score(detected: &WordForms, token: &Token) -> Option<f32> {
    let (shorter, longer) = if char_len(&detected.normalized) <= char_len(&token.normalized) {
        (&detected.normalized, &token.normalized)
    } else {
        (&token.normalized, &detected.normalized)
    };

    let shorter_len = char_len(shorter);
    if shorter_len < SUBSTRING_MIN_CHARS || !longer.contains(shorter.as_str()) {
        return None;
    }

    let ratio = shorter_len as f32 / char_len(longer) as f32;
    Some(SUBSTRING_MIN_SIMILARITY + (SUBSTRING_MAX_SIMILARITY - SUBSTRING_MIN_SIMILARITY) * ratio)
}

/// `1 - distance / longest`, measured in characters.
fn edit_ratio(distance: usize, a: &str, b: &str) -> f32 {
    let longest = char_len(a).max(char_len(b));
    if longest == 0 {
        return 1.0;
    }

    1.0 - distance as f32 / longest as f32
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
