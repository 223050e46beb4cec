//! Evaluation pipeline orchestrator.
//!
//! [`EvalEngine`] sequences the stages for one rule — structural gate,
//! single fingerprint extraction, huntability, semantic comparison, novelty
//! — and aggregates many rules into corpus metrics. Rule evaluations share
//! no mutable state, so dataset items map onto the rayon pool when
//! `parallel` is enabled.

use crate::config::EvalConfig;
use crate::error::Result;
use crate::fingerprint::{extract_behavioral_core, extract_from_rule};
use crate::huntability::HuntabilityScorer;
use crate::novelty::{NoveltyDetector, NoveltyStatus, RuleCorpus};
use crate::report::{CorpusMetrics, DatasetItem, NoveltyDistribution, RuleReport};
use crate::rule::Rule;
use crate::semantic::{EmbeddingCapability, JudgeCapability, SemanticScorer};
use crate::stability::{RuleGenerator, StabilityResult, StabilityTester};
use crate::validator::{BaseGrammarValidator, StructuralValidator};
use rayon::prelude::*;
use tracing::warn;

/// Multi-stage rule evaluation engine.
///
/// # Examples
///
/// ```rust
/// use sigma_eval::EvalEngine;
///
/// let engine = EvalEngine::new()?;
/// let report = engine.evaluate_rule(r#"
/// title: Scheduled Task Creation
/// logsource:
///     category: process_creation
///     product: windows
/// detection:
///     selection:
///         CommandLine|contains: 'schtasks /create'
///     condition: selection
/// "#, None, None);
/// assert!(report.structural.final_pass);
/// assert!(report.huntability.is_some());
/// # Ok::<(), sigma_eval::EvalError>(())
/// ```
pub struct EvalEngine {
    config: EvalConfig,
    validator: StructuralValidator,
    semantic: SemanticScorer,
}

/// Builder wiring capabilities and configuration into an [`EvalEngine`].
pub struct EvalEngineBuilder {
    config: EvalConfig,
    base_validator: Option<Box<dyn BaseGrammarValidator>>,
    judge: Option<Box<dyn JudgeCapability>>,
    embedder: Option<Box<dyn EmbeddingCapability>>,
}

impl EvalEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EvalConfig::default(),
            base_validator: None,
            judge: None,
            embedder: None,
        }
    }

    pub fn with_config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_base_validator(mut self, validator: Box<dyn BaseGrammarValidator>) -> Self {
        self.base_validator = Some(validator);
        self
    }

    pub fn with_judge(mut self, judge: Box<dyn JudgeCapability>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingCapability>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn build(self) -> Result<EvalEngine> {
        self.config.validate()?;

        let validator = match self.base_validator {
            Some(base) => StructuralValidator::with_base_validator(base),
            None => StructuralValidator::new(),
        };

        let mut semantic = SemanticScorer::new();
        if let Some(judge) = self.judge {
            semantic = semantic.with_judge(judge);
        }
        if let Some(embedder) = self.embedder {
            semantic = semantic.with_embedder(embedder);
        }

        Ok(EvalEngine {
            config: self.config,
            validator,
            semantic,
        })
    }
}

impl Default for EvalEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

enum ItemOutcome {
    GenerationFailed,
    Evaluated {
        report: RuleReport,
        stability: Option<StabilityResult>,
    },
}

impl EvalEngine {
    /// Engine with default configuration and no external capabilities.
    pub fn new() -> Result<Self> {
        EvalEngineBuilder::new().build()
    }

    pub fn builder() -> EvalEngineBuilder {
        EvalEngineBuilder::new()
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate one rule.
    ///
    /// The structural gate runs first; on failure the remaining stages are
    /// skipped and their slots in the report stay `None`. On success the
    /// behavioral core is extracted once and shared by the semantic and
    /// novelty stages.
    pub fn evaluate_rule(
        &self,
        rule_text: &str,
        reference_rule: Option<&str>,
        corpus: Option<&dyn RuleCorpus>,
    ) -> RuleReport {
        let structural = self.validator.validate(rule_text);
        if !structural.final_pass {
            return RuleReport::structural_failure(structural);
        }

        // The gate passed, so this parse cannot fail under the default base
        // validator; fall back to text-based extraction if a permissive
        // custom validator let an unparsable rule through.
        let (core, huntability) = match Rule::from_yaml(rule_text) {
            Ok(rule) => (
                extract_from_rule(&rule),
                HuntabilityScorer::with_weights(self.config.huntability).score_parsed(&rule),
            ),
            Err(_) => (
                extract_behavioral_core(rule_text),
                HuntabilityScorer::with_weights(self.config.huntability).score_rule(rule_text),
            ),
        };

        let semantic =
            reference_rule.map(|reference| self.semantic.compare_rules(rule_text, reference));

        let novelty = corpus.map(|corpus| {
            NoveltyDetector::with_thresholds(self.config.novelty)
                .detect_novelty_for_core(&core, Some(corpus))
        });

        RuleReport {
            structural,
            core: Some(core),
            huntability: Some(huntability),
            semantic,
            novelty,
        }
    }

    /// Measure generation stability for one input id.
    pub fn test_stability(
        &self,
        input_id: &str,
        generator: &dyn RuleGenerator,
        reference_rule: Option<&str>,
    ) -> StabilityResult {
        StabilityTester::with_weights(self.config.stability)
            .with_semantic_scorer(&self.semantic)
            .test_stability(input_id, generator, reference_rule, self.config.stability_runs)
    }

    /// Evaluate a dataset and aggregate corpus metrics.
    ///
    /// Items whose generation step fails are recorded as errors, excluded
    /// from metric denominators, and counted in `total`. Stability is
    /// measured per item only when a generator is supplied and
    /// `stability_runs` is nonzero.
    pub fn evaluate_dataset(
        &self,
        items: &[DatasetItem],
        generator: Option<&dyn RuleGenerator>,
        corpus: Option<&dyn RuleCorpus>,
    ) -> CorpusMetrics {
        let outcomes: Vec<ItemOutcome> = if self.config.parallel {
            items
                .par_iter()
                .map(|item| self.evaluate_item(item, generator, corpus))
                .collect()
        } else {
            items
                .iter()
                .map(|item| self.evaluate_item(item, generator, corpus))
                .collect()
        };

        self.aggregate(items.len(), outcomes)
    }

    fn evaluate_item(
        &self,
        item: &DatasetItem,
        generator: Option<&dyn RuleGenerator>,
        corpus: Option<&dyn RuleCorpus>,
    ) -> ItemOutcome {
        let rule_text = match (&item.rule_text, generator) {
            (Some(text), _) => text.clone(),
            (None, Some(generator)) => match generator.generate(&item.input_id) {
                Ok(text) => text,
                Err(e) => {
                    warn!(input_id = %item.input_id, error = %e, "generation failed");
                    return ItemOutcome::GenerationFailed;
                }
            },
            (None, None) => {
                warn!(input_id = %item.input_id, "item has no rule text and no generator");
                return ItemOutcome::GenerationFailed;
            }
        };

        let report = self.evaluate_rule(&rule_text, item.reference_rule.as_deref(), corpus);

        let stability = match (generator, self.config.stability_runs) {
            (Some(generator), runs) if runs > 0 && report.structural.final_pass => {
                Some(self.test_stability(
                    &item.input_id,
                    generator,
                    item.reference_rule.as_deref(),
                ))
            }
            _ => None,
        };

        ItemOutcome::Evaluated { report, stability }
    }

    fn aggregate(&self, total: usize, outcomes: Vec<ItemOutcome>) -> CorpusMetrics {
        let mut errors = 0usize;
        let mut evaluated = 0usize;
        let mut structural_passes = 0usize;
        let mut huntability_sum = 0.0;
        let mut huntability_count = 0usize;
        let mut semantic_sum = 0.0;
        let mut semantic_count = 0usize;
        let mut stability_sum = 0.0;
        let mut stability_count = 0usize;
        let mut distribution = NoveltyDistribution::default();

        for outcome in outcomes {
            match outcome {
                ItemOutcome::GenerationFailed => errors += 1,
                ItemOutcome::Evaluated { report, stability } => {
                    evaluated += 1;
                    if report.structural.final_pass {
                        structural_passes += 1;
                    }
                    if let Some(huntability) = &report.huntability {
                        huntability_sum += huntability.score;
                        huntability_count += 1;
                    }
                    if let Some(semantic) = &report.semantic {
                        semantic_sum += semantic.similarity_score;
                        semantic_count += 1;
                    }
                    if let Some(novelty) = &report.novelty {
                        match novelty.novelty_status {
                            NoveltyStatus::Duplicate => distribution.duplicates += 1,
                            NoveltyStatus::Variant => distribution.variants += 1,
                            NoveltyStatus::Novel => distribution.novel += 1,
                        }
                    }
                    if let Some(stability) = stability {
                        stability_sum += stability.stability_score;
                        stability_count += 1;
                    }
                }
            }
        }

        CorpusMetrics {
            total,
            errors,
            structural_pass_rate: if evaluated > 0 {
                structural_passes as f64 / evaluated as f64
            } else {
                0.0
            },
            mean_huntability: if huntability_count > 0 {
                huntability_sum / huntability_count as f64
            } else {
                0.0
            },
            mean_semantic_similarity: (semantic_count > 0)
                .then(|| semantic_sum / semantic_count as f64),
            novelty_distribution: distribution,
            mean_stability: (stability_count > 0)
                .then(|| stability_sum / stability_count as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::novelty::{CorpusEntry, VecCorpus};

    const GOOD_RULE: &str = r#"
title: Scheduled Task Creation
logsource:
    category: process_creation
    product: windows
detection:
    selection:
        CommandLine|contains:
            - 'schtasks'
            - '/create'
    condition: selection
"#;

    const BAD_RULE: &str = r#"
title: Broken
logsource:
    category: process_creation
    product: windows
detection:
    selection:
        CommandLine: '*'
    condition: selection or not selection
"#;

    struct EchoGenerator;
    impl RuleGenerator for EchoGenerator {
        fn generate(&self, _input_id: &str) -> Result<String> {
            Ok(GOOD_RULE.to_string())
        }
    }

    struct DownGenerator;
    impl RuleGenerator for DownGenerator {
        fn generate(&self, _input_id: &str) -> Result<String> {
            Err(EvalError::GenerationError("llm offline".to_string()))
        }
    }

    #[test]
    fn test_structural_failure_short_circuits() {
        let engine = EvalEngine::new().unwrap();
        let report = engine.evaluate_rule(BAD_RULE, Some(GOOD_RULE), None);
        assert!(!report.structural.final_pass);
        assert!(report.core.is_none());
        assert!(report.huntability.is_none());
        assert!(report.semantic.is_none());
        assert!(report.novelty.is_none());
    }

    #[test]
    fn test_passing_rule_runs_all_requested_stages() {
        let engine = EvalEngine::new().unwrap();
        let corpus = VecCorpus(vec![CorpusEntry {
            id: "r1".to_string(),
            title: "Scheduled Task Creation".to_string(),
            rule_text: GOOD_RULE.to_string(),
        }]);
        let report = engine.evaluate_rule(GOOD_RULE, Some(GOOD_RULE), Some(&corpus));
        assert!(report.structural.final_pass);
        assert!(report.core.is_some());
        assert!(report.huntability.is_some());
        assert!(report.semantic.is_some());
        let novelty = report.novelty.unwrap();
        assert_eq!(novelty.closest_similarity, Some(1.0));
    }

    #[test]
    fn test_stages_skipped_without_inputs() {
        let engine = EvalEngine::new().unwrap();
        let report = engine.evaluate_rule(GOOD_RULE, None, None);
        assert!(report.semantic.is_none());
        assert!(report.novelty.is_none());
        assert!(report.huntability.is_some());
    }

    #[test]
    fn test_dataset_counts_generation_errors() {
        let engine = EvalEngine::new().unwrap();
        let items = vec![
            DatasetItem::new("a").with_rule_text(GOOD_RULE),
            DatasetItem::new("b"),
        ];
        let metrics = engine.evaluate_dataset(&items, Some(&DownGenerator), None);
        assert_eq!(metrics.total, 2);
        assert_eq!(metrics.errors, 1);
        assert_eq!(metrics.structural_pass_rate, 1.0);
    }

    #[test]
    fn test_dataset_aggregates_metrics() {
        let mut config = EvalConfig::default();
        config.stability_runs = 0;
        let engine = EvalEngine::builder().with_config(config).build().unwrap();

        let items = vec![
            DatasetItem::new("a")
                .with_rule_text(GOOD_RULE)
                .with_reference(GOOD_RULE),
            DatasetItem::new("b").with_rule_text(BAD_RULE),
        ];
        let metrics = engine.evaluate_dataset(&items, None, None);
        assert_eq!(metrics.total, 2);
        assert_eq!(metrics.errors, 0);
        assert_eq!(metrics.structural_pass_rate, 0.5);
        assert!(metrics.mean_huntability > 0.0);
        // Only item "a" had a reference; neutral scorer gives 0.5.
        assert_eq!(metrics.mean_semantic_similarity, Some(0.5));
        assert!(metrics.mean_stability.is_none());
    }

    #[test]
    fn test_dataset_stability_pass() {
        let mut config = EvalConfig::default();
        config.stability_runs = 3;
        config.parallel = false;
        let engine = EvalEngine::builder().with_config(config).build().unwrap();

        let items = vec![DatasetItem::new("a")];
        let metrics = engine.evaluate_dataset(&items, Some(&EchoGenerator), None);
        assert_eq!(metrics.errors, 0);
        assert_eq!(metrics.mean_stability, Some(1.0));
    }

    #[test]
    fn test_invalid_config_rejected_at_build() {
        let mut config = EvalConfig::default();
        config.novelty.variant = 0.99;
        let result = EvalEngine::builder().with_config(config).build();
        assert!(result.is_err());
    }
}
