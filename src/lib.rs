//! # SIGMA Rule Evaluation Pipeline
//!
//! A Rust library for evaluating machine-generated [SIGMA detection rules](https://github.com/SigmaHQ/sigma)
//! for structural correctness, behavioral intent, huntability, generation
//! stability, and novelty against a rule corpus.
//!
//! The pipeline decides whether a generated rule is usable, how good it is,
//! and whether it duplicates existing knowledge:
//!
//! 1. **Structural validation** — a pluggable base-grammar gate plus
//!    extended heuristics (telemetry feasibility, condition cross-checks,
//!    impossible selections, pattern safety, IOC leakage, field
//!    conformance).
//! 2. **Fingerprinting** — the rule's behavioral core is normalized and
//!    hashed so that formatting, ordering, and quoting never matter.
//! 3. **Huntability scoring** — a weighted heuristic for how useful the
//!    rule is to a human threat hunter.
//! 4. **Semantic comparison** — LLM-judge or embedding strategy against a
//!    reference rule, with graceful fallback.
//! 5. **Stability testing** — regenerate N times, measure drift.
//! 6. **Novelty detection** — duplicate / variant / novel against a corpus.
//!
//! ## Quick Start
//!
//! ```rust
//! use sigma_eval::EvalEngine;
//!
//! let engine = EvalEngine::new()?;
//! let report = engine.evaluate_rule(r#"
//! title: Scheduled Task Creation
//! logsource:
//!     category: process_creation
//!     product: windows
//! detection:
//!     selection:
//!         CommandLine|contains: 'schtasks /create'
//!     condition: selection
//! "#, None, None);
//!
//! assert!(report.structural.final_pass);
//! println!("{}", report.to_json());
//! # Ok::<(), sigma_eval::EvalError>(())
//! ```
//!
//! ### Wiring external capabilities
//!
//! ```rust,ignore
//! use sigma_eval::{EvalEngine, JudgeCapability, EmbeddingCapability};
//!
//! let engine = EvalEngine::builder()
//!     .with_judge(Box::new(my_llm_judge))
//!     .with_embedder(Box::new(my_embedding_client))
//!     .build()?;
//! ```
//!
//! ### Dataset evaluation
//!
//! ```rust,ignore
//! use sigma_eval::{DatasetItem, EvalEngine};
//!
//! let items: Vec<DatasetItem> = inputs
//!     .iter()
//!     .map(|id| DatasetItem::new(id).with_reference(reference_for(id)))
//!     .collect();
//!
//! let metrics = engine.evaluate_dataset(&items, Some(&generator), Some(&corpus));
//! println!("pass rate: {}", metrics.structural_pass_rate);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod huntability;
pub mod novelty;
pub mod report;
pub mod rule;
pub mod semantic;
pub mod stability;
pub mod validator;

// Primary engine interface
pub use engine::{EvalEngine, EvalEngineBuilder};

// Configuration
pub use config::{EvalConfig, HuntabilityWeights, NoveltyThresholds, StabilityWeights};

// Core types and errors
pub use error::{EvalError, Result};
pub use rule::{Detection, Logsource, Rule, SelectionValue};

// Validation
pub use validator::{
    BaseGrammarValidator, BaseValidation, ExtendedValidationResult, StructuralValidator,
    YamlGrammarValidator,
};

// Fingerprinting
pub use fingerprint::{
    compare_cores, extract_behavioral_core, normalize_selector, BehavioralCore, CoreComparison,
};

// Scoring stages
pub use huntability::{FalsePositiveRisk, HuntabilityScore, HuntabilityScorer};
pub use novelty::{CorpusEntry, NoveltyDetector, NoveltyResult, NoveltyStatus, RuleCorpus, VecCorpus};
pub use semantic::{
    EmbeddingCapability, JudgeCapability, SemanticComparisonResult, SemanticMethod, SemanticScorer,
};
pub use stability::{RuleGenerator, StabilityResult, StabilityTester};

// Reports
pub use report::{CorpusMetrics, DatasetItem, NoveltyDistribution, RuleReport};
