//! Evaluation reports and corpus-level metrics.
//!
//! Plain serializable records; nothing here is mutated after construction.
//! Upstream tooling consumes these as JSON.

use crate::fingerprint::BehavioralCore;
use crate::huntability::HuntabilityScore;
use crate::novelty::NoveltyResult;
use crate::semantic::SemanticComparisonResult;
use crate::validator::ExtendedValidationResult;
use serde::Serialize;

/// Full evaluation report for one rule.
///
/// When the structural gate fails, every later stage is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleReport {
    pub structural: ExtendedValidationResult,
    pub core: Option<BehavioralCore>,
    pub huntability: Option<HuntabilityScore>,
    pub semantic: Option<SemanticComparisonResult>,
    pub novelty: Option<NoveltyResult>,
}

impl RuleReport {
    /// Report for a rule that failed the structural gate.
    pub(crate) fn structural_failure(structural: ExtendedValidationResult) -> Self {
        Self {
            structural,
            core: None,
            huntability: None,
            semantic: None,
            novelty: None,
        }
    }

    /// Serialize to pretty JSON for upstream consumers.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One dataset item for [`EvalEngine::evaluate_dataset`](crate::EvalEngine::evaluate_dataset).
///
/// Carries either pre-generated rule text or just an input id for the
/// generator callback to work from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetItem {
    pub input_id: String,
    pub rule_text: Option<String>,
    pub reference_rule: Option<String>,
}

impl DatasetItem {
    pub fn new(input_id: impl Into<String>) -> Self {
        Self {
            input_id: input_id.into(),
            rule_text: None,
            reference_rule: None,
        }
    }

    pub fn with_rule_text(mut self, rule_text: impl Into<String>) -> Self {
        self.rule_text = Some(rule_text.into());
        self
    }

    pub fn with_reference(mut self, reference_rule: impl Into<String>) -> Self {
        self.reference_rule = Some(reference_rule.into());
        self
    }
}

/// Novelty outcome counts across a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NoveltyDistribution {
    pub duplicates: usize,
    pub variants: usize,
    pub novel: usize,
}

/// Aggregated metrics across a dataset evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusMetrics {
    /// All items, including ones whose generation step failed.
    pub total: usize,
    /// Items that produced no rule text to evaluate.
    pub errors: usize,
    /// Fraction of evaluated items passing structural validation.
    pub structural_pass_rate: f64,
    /// Mean huntability over items that reached the huntability stage.
    pub mean_huntability: f64,
    /// Mean semantic similarity over items that had a reference rule.
    pub mean_semantic_similarity: Option<f64>,
    /// Over items that had a corpus handle.
    pub novelty_distribution: NoveltyDistribution,
    /// Mean stability score when stability runs were requested.
    pub mean_stability: Option<f64>,
}

impl CorpusMetrics {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
