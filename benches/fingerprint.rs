//! Fingerprinting and validation benchmarks
//!
//! These benchmarks measure behavioral-core extraction, core comparison,
//! and the full structural validation pipeline, which dominate dataset
//! evaluation cost.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sigma_eval::{compare_cores, extract_behavioral_core, EvalEngine, StructuralValidator};

const RULE_YAML: &str = r#"
title: Suspicious Scheduled Task Creation
id: 12345678-1234-1234-1234-123456789012
description: Detects scheduled task creation with system-level persistence flags
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
            - '/sc minute'
            - '/ru system'
    filter:
        ParentImage|endswith: '\explorer.exe'
    condition: selection and not filter
level: high
"#;

fn bench_core_extraction(c: &mut Criterion) {
    c.bench_function("core_extraction", |b| {
        b.iter(|| black_box(extract_behavioral_core(black_box(RULE_YAML))))
    });
}

fn bench_core_comparison(c: &mut Criterion) {
    let a = extract_behavioral_core(RULE_YAML);
    let b_core = extract_behavioral_core(&RULE_YAML.replace("'/ru system'", "'/f'"));

    c.bench_function("core_comparison", |b| {
        b.iter(|| black_box(compare_cores(black_box(&a), black_box(&b_core))))
    });
}

fn bench_structural_validation(c: &mut Criterion) {
    let validator = StructuralValidator::new();

    c.bench_function("structural_validation", |b| {
        b.iter(|| black_box(validator.validate(black_box(RULE_YAML))))
    });
}

/// Full single-rule evaluation at increasing corpus sizes.
fn bench_evaluation_scaling(c: &mut Criterion) {
    use sigma_eval::{CorpusEntry, VecCorpus};

    let engine = EvalEngine::new().unwrap();
    let mut group = c.benchmark_group("evaluation_scaling");

    for corpus_size in [10usize, 100, 500] {
        let corpus = VecCorpus(
            (0..corpus_size)
                .map(|i| CorpusEntry {
                    id: format!("rule-{i}"),
                    title: format!("Corpus Rule {i}"),
                    rule_text: RULE_YAML.replace("'/create'", &format!("'/marker-{i}'")),
                })
                .collect(),
        );

        group.bench_with_input(
            BenchmarkId::from_parameter(corpus_size),
            &corpus,
            |b, corpus| {
                b.iter(|| {
                    black_box(engine.evaluate_rule(
                        black_box(RULE_YAML),
                        Some(RULE_YAML),
                        Some(corpus),
                    ))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_core_extraction,
    bench_core_comparison,
    bench_structural_validation,
    bench_evaluation_scaling
);
criterion_main!(benches);
