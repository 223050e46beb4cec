//! Cross-run generation stability.
//!
//! Regenerates a rule N times for the same input and measures how much the
//! behavioral core drifts: identical generations share a `core_hash`,
//! unstable generators scatter across hashes and selector counts. A failed
//! generation run is skipped and logged, never fatal.

use crate::config::StabilityWeights;
use crate::error::Result;
use crate::fingerprint::extract_behavioral_core;
use crate::semantic::SemanticScorer;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// "Generate a rule for input X" callback, typically an LLM pipeline.
/// May be slow or unreliable; each invocation is independent.
pub trait RuleGenerator: Send + Sync {
    fn generate(&self, input_id: &str) -> Result<String>;
}

/// Stability metrics across N generation runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityResult {
    pub runs_attempted: usize,
    pub runs_succeeded: usize,
    /// Distinct `core_hash` values across successful runs.
    pub unique_hashes: usize,
    /// Fraction of successful runs sharing the modal hash.
    pub hash_consistency: f64,
    /// Coefficient of variation of the selector counts.
    pub selectors_variance: f64,
    /// Coefficient of variation of per-run semantic similarity.
    pub semantic_variance: f64,
    /// Weighted composite, 0.0 to 1.0; >= 0.85 is considered stable.
    pub stability_score: f64,
}

impl StabilityResult {
    fn empty(runs_attempted: usize) -> Self {
        Self {
            runs_attempted,
            runs_succeeded: 0,
            unique_hashes: 0,
            hash_consistency: 0.0,
            selectors_variance: 0.0,
            semantic_variance: 0.0,
            stability_score: 0.0,
        }
    }
}

/// Measures generation stability for one input.
pub struct StabilityTester<'a> {
    weights: StabilityWeights,
    semantic: Option<&'a SemanticScorer>,
}

impl<'a> StabilityTester<'a> {
    pub fn new() -> Self {
        Self {
            weights: StabilityWeights::default(),
            semantic: None,
        }
    }

    pub fn with_weights(weights: StabilityWeights) -> Self {
        Self {
            weights,
            semantic: None,
        }
    }

    /// Score per-run semantic similarity against the reference rule using
    /// the given scorer.
    pub fn with_semantic_scorer(mut self, scorer: &'a SemanticScorer) -> Self {
        self.semantic = Some(scorer);
        self
    }

    /// Run `generator` `num_runs` times for `input_id` and measure drift.
    ///
    /// Zero successful runs produce an all-zero result, not an error.
    pub fn test_stability(
        &self,
        input_id: &str,
        generator: &dyn RuleGenerator,
        reference_rule: Option<&str>,
        num_runs: usize,
    ) -> StabilityResult {
        let mut hashes: Vec<String> = Vec::new();
        let mut selector_counts: Vec<f64> = Vec::new();
        let mut similarities: Vec<f64> = Vec::new();

        for run in 0..num_runs {
            let rule_text = match generator.generate(input_id) {
                Ok(text) => text,
                Err(e) => {
                    warn!(input_id, run, error = %e, "generation run failed, skipping");
                    continue;
                }
            };

            let core = extract_behavioral_core(&rule_text);
            selector_counts.push(core.selector_count as f64);
            hashes.push(core.core_hash);

            if let (Some(reference), Some(scorer)) = (reference_rule, self.semantic) {
                similarities.push(scorer.compare_rules(&rule_text, reference).similarity_score);
            }
        }

        let succeeded = hashes.len();
        if succeeded == 0 {
            return StabilityResult::empty(num_runs);
        }

        let mut hash_counts: HashMap<&str, usize> = HashMap::new();
        for hash in &hashes {
            *hash_counts.entry(hash.as_str()).or_insert(0) += 1;
        }
        let modal = hash_counts.values().copied().max().unwrap_or(0);
        let hash_consistency = modal as f64 / succeeded as f64;

        let selectors_variance = coefficient_of_variation(&selector_counts);
        let semantic_variance = coefficient_of_variation(&similarities);

        let stability_score = self.weights.hash_consistency * hash_consistency
            + self.weights.selectors_variance * (1.0 - selectors_variance.min(1.0))
            + self.weights.semantic_variance * (1.0 - semantic_variance.min(1.0));

        StabilityResult {
            runs_attempted: num_runs,
            runs_succeeded: succeeded,
            unique_hashes: hash_counts.len(),
            hash_consistency,
            selectors_variance,
            semantic_variance,
            stability_score,
        }
    }
}

impl Default for StabilityTester<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// stdev / mean, or 0 when fewer than two samples or a zero mean.
fn coefficient_of_variation(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt() / mean
}
