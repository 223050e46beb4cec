//! Huntability scoring.
//!
//! A heuristic composite of how useful a rule is to a human threat hunter:
//! specific command lines, a clear technique reference, parent/child
//! context, feasible telemetry, and no reliance on one-off indicators.

use crate::config::HuntabilityWeights;
use crate::rule::{split_field_expr, Rule};
use crate::validator::ioc::count_network_indicators;
use crate::validator::telemetry::{classify_logsource, TelemetryFit};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// False-positive risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FalsePositiveRisk {
    Low,
    Medium,
    High,
}

/// Huntability assessment for one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HuntabilityScore {
    /// Composite score, 0.0 to 10.0.
    pub score: f64,
    pub false_positive_risk: FalsePositiveRisk,
    pub coverage_notes: String,
    /// Sub-metric name to score on the same 0-10 scale.
    pub breakdown: BTreeMap<String, f64>,
}

fn technique_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(attack\.)?ta?\d{4}(\.\d{3})?$").expect("static pattern"))
}

/// ATT&CK-style tag: a technique/tactic id or an `attack.` namespace tag.
fn is_attack_tag(tag: &str) -> bool {
    technique_regex().is_match(tag) || tag.to_lowercase().starts_with("attack.")
}

/// Weighted huntability scorer.
///
/// # Examples
///
/// ```rust
/// use sigma_eval::HuntabilityScorer;
///
/// let score = HuntabilityScorer::new().score_rule(r#"
/// title: Scheduled Task Creation
/// logsource:
///     category: process_creation
///     product: windows
/// detection:
///     selection:
///         CommandLine|contains: 'schtasks /create'
///     condition: selection
/// "#);
/// assert!(score.score > 0.0);
/// ```
pub struct HuntabilityScorer {
    weights: HuntabilityWeights,
}

impl HuntabilityScorer {
    pub fn new() -> Self {
        Self {
            weights: HuntabilityWeights::default(),
        }
    }

    pub fn with_weights(weights: HuntabilityWeights) -> Self {
        Self { weights }
    }

    /// Score a rule from text. Parse failure yields score 0.0, risk high.
    pub fn score_rule(&self, rule_text: &str) -> HuntabilityScore {
        match Rule::from_yaml(rule_text) {
            Ok(rule) => self.score_parsed(&rule),
            Err(_) => HuntabilityScore {
                score: 0.0,
                false_positive_risk: FalsePositiveRisk::High,
                coverage_notes: "rule failed to parse".to_string(),
                breakdown: BTreeMap::new(),
            },
        }
    }

    /// Score an already-parsed rule.
    pub fn score_parsed(&self, rule: &Rule) -> HuntabilityScore {
        let subs = [
            (
                "commandline_specificity",
                commandline_specificity(rule),
                self.weights.commandline_specificity,
            ),
            ("ttp_clarity", ttp_clarity(rule), self.weights.ttp_clarity),
            ("parent_child", parent_child(rule), self.weights.parent_child),
            (
                "telemetry_feasibility",
                telemetry_feasibility(rule),
                self.weights.telemetry_feasibility,
            ),
            ("overfitting", overfitting(rule), self.weights.overfitting),
        ];

        let weighted: f64 = subs.iter().map(|(_, s, w)| s * w).sum();
        let score = (weighted * 10.0).clamp(0.0, 10.0);

        let risk = false_positive_risk(rule);
        let mut notes: Vec<String> = subs
            .iter()
            .filter(|(_, s, _)| *s < 0.5)
            .map(|(name, _, _)| format!("weak {name}"))
            .collect();
        if risk == FalsePositiveRisk::High {
            notes.push("high false-positive risk".to_string());
        }

        let breakdown: BTreeMap<String, f64> = subs
            .iter()
            .map(|(name, s, _)| (name.to_string(), s * 10.0))
            .collect();

        HuntabilityScore {
            score,
            false_positive_risk: risk,
            coverage_notes: notes.join("; "),
            breakdown,
        }
    }
}

impl Default for HuntabilityScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn commandline_values(rule: &Rule) -> Vec<String> {
    let mut values = Vec::new();
    rule.visit_detection_leaves(|_, field_expr, value| {
        let (base, _) = split_field_expr(field_expr);
        if base.to_lowercase().contains("command") {
            values.push(value.to_string());
        }
    });
    values
}

/// Fraction of command-line values that are not pure or near-pure wildcards.
/// 0.3 baseline when the rule has no command-line field at all.
fn commandline_specificity(rule: &Rule) -> f64 {
    let values = commandline_values(rule);
    if values.is_empty() {
        return 0.3;
    }
    let specific = values.iter().filter(|v| !is_wildcardish(v)).count();
    specific as f64 / values.len() as f64
}

fn is_wildcardish(value: &str) -> bool {
    let stripped: String = value
        .chars()
        .filter(|c| *c != '*' && !c.is_whitespace())
        .collect();
    stripped.len() < 3
}

fn ttp_clarity(rule: &Rule) -> f64 {
    let mut score: f64 = 0.5;
    if rule.tags.iter().any(|tag| is_attack_tag(tag)) {
        score += 0.3;
    }
    if let Some(description) = &rule.description {
        if description.len() > 50 {
            score += 0.1;
        }
        let lowered = description.to_lowercase();
        if lowered.contains("ttp") || lowered.contains("technique") {
            score += 0.1;
        }
    }
    score.min(1.0)
}

fn parent_child(rule: &Rule) -> f64 {
    let mut has_image = false;
    let mut has_parent = false;
    rule.visit_detection_leaves(|_, field_expr, _| {
        let base = split_field_expr(field_expr).0.to_lowercase();
        if base == "image" {
            has_image = true;
        } else if base == "parentimage" {
            has_parent = true;
        }
    });
    let mut score = 0.5;
    if has_image {
        score += 0.3;
    }
    if has_parent {
        score += 0.2;
    }
    score
}

fn telemetry_feasibility(rule: &Rule) -> f64 {
    match classify_logsource(&rule.logsource) {
        TelemetryFit::Known => 1.0,
        TelemetryFit::Incoherent | TelemetryFit::UnknownCategory => 0.7,
        TelemetryFit::Incomplete => {
            let present = rule.logsource.category.is_some() as u8
                + rule.logsource.product.is_some() as u8;
            if present == 1 {
                0.5
            } else {
                0.3
            }
        }
    }
}

/// Inverted IOC density: specific indicators in the detection block mean the
/// rule is fitted to one incident rather than a behavior.
fn overfitting(rule: &Rule) -> f64 {
    match count_network_indicators(rule) {
        0 => 1.0,
        1 => 0.8,
        2 => 0.6,
        _ => 0.3,
    }
}

fn false_positive_risk(rule: &Rule) -> FalsePositiveRisk {
    let mut factors = 0;
    rule.visit_detection_leaves(|_, _, value| {
        let trimmed = value.trim();
        if trimmed == "*" || trimmed == ".*" || (!trimmed.is_empty() && trimmed.chars().all(|c| c == '*')) {
            factors += 2;
        } else {
            let stripped: String = trimmed.chars().filter(|c| *c != '*').collect();
            if stripped.len() < 3 {
                factors += 1;
            }
        }
    });
    if factors >= 3 {
        FalsePositiveRisk::High
    } else if factors >= 1 {
        FalsePositiveRisk::Medium
    } else {
        FalsePositiveRisk::Low
    }
}
