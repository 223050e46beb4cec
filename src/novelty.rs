//! Novelty classification against a rule corpus.
//!
//! Answers whether a generated rule duplicates, lightly varies, or
//! meaningfully differs from what the corpus already knows. An exact
//! `core_hash` match short-circuits the scan; otherwise the best selector
//! overlap across the corpus decides.

use crate::config::NoveltyThresholds;
use crate::fingerprint::{compare_cores, extract_behavioral_core, BehavioralCore};
use serde::Serialize;

/// One existing rule in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub id: String,
    pub title: String,
    pub rule_text: String,
}

/// Read interface over an existing rule corpus.
pub trait RuleCorpus: Send + Sync {
    fn entries(&self) -> Vec<CorpusEntry>;
}

/// In-memory corpus.
#[derive(Debug, Clone, Default)]
pub struct VecCorpus(pub Vec<CorpusEntry>);

impl RuleCorpus for VecCorpus {
    fn entries(&self) -> Vec<CorpusEntry> {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoveltyStatus {
    Duplicate,
    Variant,
    Novel,
}

/// Novelty classification for one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoveltyResult {
    /// 0 = duplicate, 1 = variant, 2 = novel.
    pub novelty_score: u8,
    pub novelty_status: NoveltyStatus,
    pub closest_match_id: Option<String>,
    pub closest_match_title: Option<String>,
    pub closest_similarity: Option<f64>,
}

impl NoveltyResult {
    fn novel_without_match() -> Self {
        Self {
            novelty_score: 2,
            novelty_status: NoveltyStatus::Novel,
            closest_match_id: None,
            closest_match_title: None,
            closest_similarity: None,
        }
    }
}

/// Classifies rules against a corpus by behavioral-core overlap.
pub struct NoveltyDetector {
    thresholds: NoveltyThresholds,
}

impl NoveltyDetector {
    pub fn new() -> Self {
        Self {
            thresholds: NoveltyThresholds::default(),
        }
    }

    pub fn with_thresholds(thresholds: NoveltyThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify `rule_text` against the corpus. No corpus means the rule is
    /// assumed novel with empty match fields.
    pub fn detect_novelty(
        &self,
        rule_text: &str,
        corpus: Option<&dyn RuleCorpus>,
    ) -> NoveltyResult {
        let candidate = extract_behavioral_core(rule_text);
        self.detect_novelty_for_core(&candidate, corpus)
    }

    /// Classify an already-extracted behavioral core, so the pipeline can
    /// fingerprint once and reuse the result.
    pub fn detect_novelty_for_core(
        &self,
        candidate: &BehavioralCore,
        corpus: Option<&dyn RuleCorpus>,
    ) -> NoveltyResult {
        let Some(corpus) = corpus else {
            return NoveltyResult::novel_without_match();
        };
        let mut best: Option<(f64, CorpusEntry)> = None;

        for entry in corpus.entries() {
            let existing = extract_behavioral_core(&entry.rule_text);
            if existing.core_hash.is_empty() {
                // Unparsable corpus rule; nothing to compare against.
                continue;
            }

            let comparison = compare_cores(candidate, &existing);
            if comparison.hash_match {
                return NoveltyResult {
                    novelty_score: 0,
                    novelty_status: NoveltyStatus::Duplicate,
                    closest_match_id: Some(entry.id),
                    closest_match_title: Some(entry.title),
                    closest_similarity: Some(1.0),
                };
            }

            if best
                .as_ref()
                .map(|(sim, _)| comparison.similarity > *sim)
                .unwrap_or(true)
            {
                best = Some((comparison.similarity, entry));
            }
        }

        let Some((similarity, entry)) = best else {
            return NoveltyResult::novel_without_match();
        };

        let (score, status) = if similarity >= self.thresholds.duplicate {
            (0, NoveltyStatus::Duplicate)
        } else if similarity >= self.thresholds.variant {
            (1, NoveltyStatus::Variant)
        } else {
            (2, NoveltyStatus::Novel)
        };

        NoveltyResult {
            novelty_score: score,
            novelty_status: status,
            closest_match_id: Some(entry.id),
            closest_match_title: Some(entry.title),
            closest_similarity: Some(similarity),
        }
    }
}

impl Default for NoveltyDetector {
    fn default() -> Self {
        Self::new()
    }
}
