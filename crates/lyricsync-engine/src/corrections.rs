//! Learns from manual corrections.
//!
//! When the singer fixes a misrecognized word by hand, the pair
//! `recognized -> correct` is remembered. Once the same correction has been
//! made often enough, later recognizer output is rewritten before it reaches
//! the aligner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tokenizer::normalize;

/// Share of entries evicted when the store overflows.
const EVICTION_SHARE: f32 = 0.2;

/// Tuning for [`CorrectionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrectionsConfig {
    /// Whether recognized words are rewritten at all.
    pub enabled: bool,
    /// How many times a correction has to be made before it is applied.
    pub min_count: u32,
    /// Maximum number of remembered corrections.
    pub max_entries: usize,
}

impl Default for CorrectionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_count: 2,
            max_entries: 100,
        }
    }
}

/// One remembered correction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Correction {
    /// Normalized word the recognizer produced.
    pub recognized: String,
    /// Normalized word the singer meant.
    pub correct: String,
    /// Number of times this correction was made.
    pub count: u32,
    /// Logical timestamp of the last use, used to evict stale entries.
    pub last_used: u64,
}

/// Set of learned corrections, keyed by the normalized recognized word.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CorrectionStore {
    #[serde(skip)]
    config: CorrectionsConfig,
    #[serde(default)]
    clock: u64,
    #[serde(default)]
    corrections: Vec<Correction>,
    #[serde(skip)]
    index: BTreeMap<String, usize>,
}

impl CorrectionStore {
    pub fn new(config: CorrectionsConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Applies `config` to a store loaded from disk and rebuilds its index.
    pub fn with_config(mut self, config: CorrectionsConfig) -> Self {
        self.config = config;
        self.rebuild_index();
        self.enforce_capacity();
        self
    }

    pub fn config(&self) -> &CorrectionsConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn get(&self, recognized: &str) -> Option<&Correction> {
        self.index
            .get(&normalize(recognized))
            .map(|&slot| &self.corrections[slot])
    }

    /// Remembers that `recognized` should have been `correct`.
    ///
    /// Returns `false` when the pair is not a correction (both sides are the
    /// same word, or one side is empty after normalization).
    pub fn learn(&mut self, recognized: &str, correct: &str) -> bool {
        let recognized = normalize(recognized);
        let correct = normalize(correct);
        if recognized.is_empty() || correct.is_empty() || recognized == correct {
            return false;
        }

        self.clock += 1;
        match self.index.get(&recognized) {
            Some(&slot) => {
                let entry = &mut self.corrections[slot];
                if entry.correct == correct {
                    entry.count += 1;
                } else {
                    entry.correct = correct;
                    entry.count = 1;
                }
                entry.last_used = self.clock;
            }
            None => {
                self.index.insert(recognized.clone(), self.corrections.len());
                self.corrections.push(Correction {
                    recognized,
                    correct,
                    count: 1,
                    last_used: self.clock,
                });
            }
        }

        self.enforce_capacity();
        true
    }

    /// Rewrites `word` if a correction for it has been made often enough.
    pub fn correct(&self, word: &str) -> Option<&str> {
        if !self.config.enabled {
            return None;
        }

        self.get(word)
            .filter(|entry| entry.count >= self.config.min_count)
            .map(|entry| entry.correct.as_str())
    }

    /// Corrections sorted by how often they were made, most frequent first.
    pub fn most_used(&self, limit: usize) -> Vec<&Correction> {
        let mut sorted: Vec<&Correction> = self.corrections.iter().collect();
        sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.recognized.cmp(&b.recognized)));
        sorted.truncate(limit);
        sorted
    }

    pub fn clear(&mut self) {
        self.corrections.clear();
        self.index.clear();
    }

    fn enforce_capacity(&mut self) {
        if self.config.max_entries == 0 || self.corrections.len() <= self.config.max_entries {
            return;
        }

        let evict = ((self.corrections.len() as f32 * EVICTION_SHARE).ceil() as usize)
            .max(self.corrections.len() - self.config.max_entries);
        self.corrections
            .sort_by(|a, b| b.last_used.cmp(&a.last_used));
        let keep = self.corrections.len() - evict;
        self.corrections.truncate(keep);
        log::debug!("Evicted {evict} stale corrections, {keep} kept");
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .corrections
            .iter()
            .enumerate()
            .map(|(slot, entry)| (entry.recognized.clone(), slot))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_only_after_repeated_corrections() {
        let mut store = CorrectionStore::new(CorrectionsConfig::default());
        assert!(store.learn("Kel", "gel"));
        assert_eq!(store.correct("kel"), None);

        assert!(store.learn("kel", "Gel"));
        assert_eq!(store.correct("KEL"), Some("gel"));
    }

    #[test]
    fn identical_pairs_are_not_corrections() {
        let mut store = CorrectionStore::new(CorrectionsConfig::default());
        assert!(!store.learn("gel", "Gel!"));
        assert!(!store.learn("...", "gel"));
        assert!(store.is_empty());
    }

    #[test]
    fn changing_the_target_restarts_the_count() {
        let mut store = CorrectionStore::new(CorrectionsConfig::default());
        store.learn("kel", "gel");
        store.learn("kel", "gel");
        store.learn("kel", "kal");
        assert_eq!(store.correct("kel"), None);
        assert_eq!(store.get("kel").map(|c| c.count), Some(1));
    }

    #[test]
    fn disabled_store_never_rewrites() {
        let mut store = CorrectionStore::new(CorrectionsConfig {
            enabled: false,
            ..CorrectionsConfig::default()
        });
        store.learn("kel", "gel");
        store.learn("kel", "gel");
        assert_eq!(store.correct("kel"), None);
    }

    #[test]
    fn overflow_evicts_least_recently_used() {
        let mut store = CorrectionStore::new(CorrectionsConfig {
            max_entries: 10,
            ..CorrectionsConfig::default()
        });
        for i in 0..11 {
            store.learn(&format!("word{i}"), "target");
        }

        assert!(store.len() <= 10);
        assert!(store.get("word0").is_none());
        assert!(store.get("word10").is_some());
    }

    #[test]
    fn most_used_orders_by_count() {
        let mut store = CorrectionStore::new(CorrectionsConfig::default());
        store.learn("a1", "b");
        store.learn("a2", "b");
        store.learn("a2", "b");
        let top = store.most_used(1);
        assert_eq!(top[0].recognized, "a2");
    }

    #[test]
    fn serialized_store_keeps_entries() {
        let mut store = CorrectionStore::new(CorrectionsConfig::default());
        store.learn("kel", "gel");
        store.learn("kel", "gel");

        let json = serde_json::to_string(&store).expect("serialize");
        let restored: CorrectionStore = serde_json::from_str::<CorrectionStore>(&json)
            .expect("deserialize")
            .with_config(CorrectionsConfig::default());
        assert_eq!(restored.correct("kel"), Some("gel"));
    }
}
