//! Basic rule evaluation example
//!
//! This example demonstrates the core evaluation pipeline:
//! 1. Structural validation of a generated SIGMA rule
//! 2. Behavioral-core fingerprinting
//! 3. Huntability scoring
//! 4. Novelty classification against a small in-memory corpus
//!
//! Run with: `cargo run --example evaluate_rule`

use sigma_eval::{CorpusEntry, EvalEngine, VecCorpus};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("SIGMA Rule Evaluation Example");
    println!("=============================\n");

    let generated_rule = r#"
title: Suspicious Scheduled Task Creation
description: Detects schtasks.exe creating a task that runs as SYSTEM
tags:
    - attack.persistence
    - attack.t1053.005
logsource:
    category: process_creation
    product: windows
detection:
    selection:
        Image|endswith: '\schtasks.exe'
        CommandLine|contains:
            - '/create'
            - '/ru system'
    condition: selection
level: medium
"#;

    let reference_rule = r#"
title: Scheduled Task Persistence
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

    let corpus = VecCorpus(vec![CorpusEntry {
        id: "corpus-001".to_string(),
        title: "Scheduled Task Persistence".to_string(),
        rule_text: reference_rule.to_string(),
    }]);

    println!("Evaluating generated rule...");
    let engine = EvalEngine::new()?;
    let report = engine.evaluate_rule(generated_rule, Some(reference_rule), Some(&corpus));

    println!(
        "Structural validation: {}",
        if report.structural.final_pass {
            "PASS"
        } else {
            "FAIL"
        }
    );
    for error in &report.structural.errors {
        println!("  error: {error}");
    }
    for warning in &report.structural.warnings {
        println!("  warning: {warning}");
    }

    if let Some(core) = &report.core {
        println!("\nBehavioral core ({} selectors):", core.selector_count);
        for selector in &core.behavior_selectors {
            println!("  {selector}");
        }
        println!("  hash: {}", core.core_hash);
    }

    if let Some(huntability) = &report.huntability {
        println!(
            "\nHuntability: {:.1}/10 (false-positive risk: {:?})",
            huntability.score, huntability.false_positive_risk
        );
        if !huntability.coverage_notes.is_empty() {
            println!("  notes: {}", huntability.coverage_notes);
        }
    }

    if let Some(novelty) = &report.novelty {
        println!("\nNovelty: {:?}", novelty.novelty_status);
        if let (Some(id), Some(similarity)) =
            (&novelty.closest_match_id, novelty.closest_similarity)
        {
            println!("  closest match: {id} (similarity {similarity:.2})");
        }
    }

    println!("\nFull report as JSON:");
    println!("{}", report.to_json());

    Ok(())
}
