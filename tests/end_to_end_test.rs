//! End-to-end pipeline tests: full evaluation runs with corpus, reference,
//! generator callback, and mock external capabilities.

use sigma_eval::{
    CorpusEntry, DatasetItem, EmbeddingCapability, EvalConfig, EvalEngine, EvalError,
    JudgeCapability, NoveltyStatus, Result, RuleGenerator, SemanticMethod, VecCorpus,
};
use std::sync::atomic::{AtomicUsize, Ordering};

const SCHTASKS_RULE: &str = r#"
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

fn corpus_with(entries: &[(&str, &str, &str)]) -> VecCorpus {
    VecCorpus(
        entries
            .iter()
            .map(|(id, title, text)| CorpusEntry {
                id: id.to_string(),
                title: title.to_string(),
                rule_text: text.to_string(),
            })
            .collect(),
    )
}

#[test]
fn test_schtasks_scenario_against_itself() {
    let engine = EvalEngine::new().unwrap();
    let corpus = corpus_with(&[("known-1", "Scheduled Task Creation", SCHTASKS_RULE)]);

    let report = engine.evaluate_rule(SCHTASKS_RULE, Some(SCHTASKS_RULE), Some(&corpus));

    assert!(report.structural.final_pass);

    let huntability = report.huntability.expect("huntability stage ran");
    assert!(huntability.score > 5.0, "got {}", huntability.score);

    // No judge or embedder configured: the semantic stage degrades to the
    // neutral result rather than failing.
    let semantic = report.semantic.expect("semantic stage ran");
    assert_eq!(semantic.method, SemanticMethod::Neutral);

    let novelty = report.novelty.expect("novelty stage ran");
    assert_eq!(novelty.novelty_status, NoveltyStatus::Duplicate);
    assert_eq!(novelty.closest_similarity, Some(1.0));
    assert_eq!(novelty.closest_match_id.as_deref(), Some("known-1"));
}

#[test]
fn test_schtasks_scenario_with_judge() {
    struct SelfAgreementJudge;
    impl JudgeCapability for SelfAgreementJudge {
        fn judge(&self, prompt: &str) -> Result<String> {
            // A real judge sees both rules in the prompt; this mock just
            // confirms equivalence.
            assert!(prompt.contains("GENERATED RULE"));
            Ok(r#"{"similarity_score": 1.0, "missing_behaviors": [], "extraneous_behaviors": []}"#
                .to_string())
        }
    }

    let engine = EvalEngine::builder()
        .with_judge(Box::new(SelfAgreementJudge))
        .build()
        .unwrap();

    let report = engine.evaluate_rule(SCHTASKS_RULE, Some(SCHTASKS_RULE), None);
    let semantic = report.semantic.unwrap();
    assert_eq!(semantic.method, SemanticMethod::Judge);
    assert!((semantic.similarity_score - 1.0).abs() < 1e-9);
    assert_eq!(semantic.missing_behaviors, 0);
}

#[test]
fn test_judge_outage_falls_back_to_embeddings() {
    struct OfflineJudge;
    impl JudgeCapability for OfflineJudge {
        fn judge(&self, _prompt: &str) -> Result<String> {
            Err(EvalError::CapabilityError("connect timeout".to_string()))
        }
    }

    struct UnitEmbedder;
    impl EmbeddingCapability for UnitEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.6, 0.8])
        }
    }

    let engine = EvalEngine::builder()
        .with_judge(Box::new(OfflineJudge))
        .with_embedder(Box::new(UnitEmbedder))
        .build()
        .unwrap();

    let report = engine.evaluate_rule(SCHTASKS_RULE, Some(SCHTASKS_RULE), None);
    let semantic = report.semantic.unwrap();
    assert_eq!(semantic.method, SemanticMethod::Embedding);
    assert!((semantic.similarity_score - 1.0).abs() < 1e-9);
}

#[test]
fn test_novelty_boundaries() {
    let engine = EvalEngine::new().unwrap();

    // One extra selector on a three-selector base: 3 of 4 shared -> 0.75.
    let base = r#"
title: Scheduled Task Creation
logsource:
    category: process_creation
    product: windows
detection:
    selection:
        Image|endswith: '\schtasks.exe'
        CommandLine|contains:
            - 'schtasks'
            - '/create'
    condition: selection
"#;
    let near = base.replace(
        "            - '/create'",
        "            - '/create'\n            - '/f'",
    );
    let close_corpus = corpus_with(&[("known-2", "Scheduled Task Creation", base)]);

    let report = engine.evaluate_rule(&near, None, Some(&close_corpus));
    let novelty = report.novelty.unwrap();
    assert_eq!(novelty.novelty_status, NoveltyStatus::Variant);
    let similarity = novelty.closest_similarity.unwrap();
    assert!((0.70..0.95).contains(&similarity), "got {similarity}");

    let unrelated = r#"
title: LSASS Memory Access
logsource:
    category: process_access
    product: windows
detection:
    selection:
        TargetImage|endswith: '\lsass.exe'
        GrantedAccess: '0x1010'
    condition: selection
"#;
    let report = engine.evaluate_rule(unrelated, None, Some(&close_corpus));
    let novelty = report.novelty.unwrap();
    assert_eq!(novelty.novelty_status, NoveltyStatus::Novel);
}

#[test]
fn test_stability_of_deterministic_generator() {
    struct Fixed;
    impl RuleGenerator for Fixed {
        fn generate(&self, _input_id: &str) -> Result<String> {
            Ok(SCHTASKS_RULE.to_string())
        }
    }

    let engine = EvalEngine::new().unwrap();
    let result = engine.test_stability("task-001", &Fixed, Some(SCHTASKS_RULE));
    assert_eq!(result.runs_attempted, 5);
    assert_eq!(result.hash_consistency, 1.0);
    assert!(result.stability_score >= 0.85);
}

#[test]
fn test_stability_of_scattering_generator() {
    struct Scatter(AtomicUsize);
    impl RuleGenerator for Scatter {
        fn generate(&self, _input_id: &str) -> Result<String> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!(
                "title: V{n}\ndetection:\n    selection:\n        CommandLine|contains: 'marker-{n}'\n    condition: selection\n"
            ))
        }
    }

    let engine = EvalEngine::new().unwrap();
    let result = engine.test_stability("task-001", &Scatter(AtomicUsize::new(0)), None);
    assert_eq!(result.unique_hashes, 5);
    assert!(result.stability_score < 0.85);
}

#[test]
fn test_dataset_evaluation_aggregates() {
    struct FlakyGenerator(AtomicUsize);
    impl RuleGenerator for FlakyGenerator {
        fn generate(&self, input_id: &str) -> Result<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if input_id == "broken-input" {
                Err(EvalError::GenerationError("model refused".to_string()))
            } else {
                Ok(SCHTASKS_RULE.to_string())
            }
        }
    }

    let mut config = EvalConfig::default();
    config.stability_runs = 0;
    config.parallel = true;
    let engine = EvalEngine::builder().with_config(config).build().unwrap();

    let corpus = corpus_with(&[("known-1", "Scheduled Task Creation", SCHTASKS_RULE)]);
    let items = vec![
        DatasetItem::new("good-input").with_reference(SCHTASKS_RULE),
        DatasetItem::new("broken-input"),
        DatasetItem::new("inline").with_rule_text(SCHTASKS_RULE),
    ];

    let generator = FlakyGenerator(AtomicUsize::new(0));
    let metrics = engine.evaluate_dataset(&items, Some(&generator), Some(&corpus));

    assert_eq!(metrics.total, 3);
    assert_eq!(metrics.errors, 1);
    assert_eq!(metrics.structural_pass_rate, 1.0);
    assert!(metrics.mean_huntability > 5.0);
    assert_eq!(metrics.mean_semantic_similarity, Some(0.5));
    assert_eq!(metrics.novelty_distribution.duplicates, 2);
    assert_eq!(metrics.novelty_distribution.novel, 0);
}

#[test]
fn test_report_serializes_to_json() {
    let engine = EvalEngine::new().unwrap();
    let report = engine.evaluate_rule(SCHTASKS_RULE, None, None);
    let json = report.to_json();
    assert!(json.contains("\"final_pass\": true"));
    assert!(json.contains("\"core_hash\""));

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(parsed["structural"]["final_pass"].as_bool().unwrap());
}
