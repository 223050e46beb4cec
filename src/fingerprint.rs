//! Behavioral-core extraction and fingerprinting.
//!
//! A rule's behavioral core is the normalized, order-independent essence of
//! what its detection block matches: formatting, key order, quoting style,
//! and wildcard run-length never affect the fingerprint. Two rules with the
//! same detection intent hash to the same `core_hash`, which is what the
//! novelty and stability stages key on.

use crate::rule::{split_field_expr, Rule};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Canonical fingerprint of a rule's detection intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BehavioralCore {
    /// Normalized `field=value` selectors, deduplicated, first-seen order.
    pub behavior_selectors: Vec<String>,
    /// Normalized values from command-line fields.
    pub commandlines: Vec<String>,
    /// Normalized `parent -> child` process chains (bare image when the
    /// selection names no parent).
    pub process_chains: Vec<String>,
    /// `sha256:<hex>` over the sorted selector set; empty for unparsable input.
    pub core_hash: String,
    pub selector_count: usize,
}

impl BehavioralCore {
    fn empty() -> Self {
        Self {
            behavior_selectors: Vec::new(),
            commandlines: Vec::new(),
            process_chains: Vec::new(),
            core_hash: String::new(),
            selector_count: 0,
        }
    }
}

/// Result of comparing two behavioral cores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreComparison {
    /// `|A ∩ B| / max(|A|, |B|, 1)` over the selector sets.
    pub similarity: f64,
    pub common_selectors: Vec<String>,
    pub only_in_first: Vec<String>,
    pub only_in_second: Vec<String>,
    pub hash_match: bool,
    pub selector_count_diff: usize,
}

/// Extract the behavioral core of a rule.
///
/// Pure and deterministic: the same rule text always yields the same core,
/// and YAML key reordering of an equivalent rule yields the same
/// `core_hash`. Unparsable input yields an empty core rather than an error.
///
/// # Examples
///
/// ```rust
/// use sigma_eval::extract_behavioral_core;
///
/// let core = extract_behavioral_core(r#"
/// title: Scheduled Task Creation
/// detection:
///     selection:
///         CommandLine|contains: 'schtasks /create'
///     condition: selection
/// "#);
/// assert_eq!(core.selector_count, 1);
/// assert!(core.core_hash.starts_with("sha256:"));
/// ```
pub fn extract_behavioral_core(rule_text: &str) -> BehavioralCore {
    let Ok(rule) = Rule::from_yaml(rule_text) else {
        return BehavioralCore::empty();
    };
    extract_from_rule(&rule)
}

/// Extract the behavioral core of an already-parsed rule.
pub fn extract_from_rule(rule: &Rule) -> BehavioralCore {
    let mut selectors: Vec<String> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut commandlines = Vec::new();

    rule.visit_detection_leaves(|_, field_expr, value| {
        let selector = format!(
            "{}={}",
            normalize_selector(field_expr),
            normalize_selector(value)
        );
        if seen.insert(selector.clone()) {
            selectors.push(selector);
        }

        let (base, _) = split_field_expr(field_expr);
        if base.to_lowercase().contains("command") {
            commandlines.push(normalize_selector(value));
        }
    });

    let process_chains = collect_process_chains(rule);

    let mut sorted: Vec<&str> = seen.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let digest = Sha256::digest(sorted.join("\n").as_bytes());
    let core_hash = format!("sha256:{}", hex::encode(digest));

    BehavioralCore {
        selector_count: selectors.len(),
        behavior_selectors: selectors,
        commandlines,
        process_chains,
        core_hash,
    }
}

/// Normalize a selector fragment: lowercase, collapse whitespace runs,
/// collapse wildcard runs, strip surrounding quotes, trim.
///
/// Idempotent: normalizing an already-normalized string is a no-op.
pub fn normalize_selector(text: &str) -> String {
    let mut s = text.trim();
    loop {
        let stripped = strip_quotes(s);
        if stripped == s {
            break;
        }
        s = stripped.trim();
    }

    let lowered = s.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_space = false;
    let mut last_star = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
            last_star = false;
        } else if ch == '*' {
            if !last_star {
                out.push('*');
            }
            last_star = true;
            last_space = false;
        } else {
            out.push(ch);
            last_space = false;
            last_star = false;
        }
    }
    out.trim().to_string()
}

fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn collect_process_chains(rule: &Rule) -> Vec<String> {
    let mut chains = Vec::new();
    for (name, _) in &rule.detection.selections {
        let mut images = Vec::new();
        let mut parents = Vec::new();
        rule.visit_detection_leaves(|sel, field_expr, value| {
            if sel != name {
                return;
            }
            let base = split_field_expr(field_expr).0.to_lowercase();
            if base == "image" || base == "originalfilename" {
                images.push(normalize_selector(value));
            } else if base == "parentimage" {
                parents.push(normalize_selector(value));
            }
        });
        for image in &images {
            match parents.first() {
                Some(parent) => chains.push(format!("{parent} -> {image}")),
                None => chains.push(image.clone()),
            }
        }
    }
    chains
}

/// Compare two behavioral cores by selector-set overlap.
pub fn compare_cores(a: &BehavioralCore, b: &BehavioralCore) -> CoreComparison {
    let set_a: BTreeSet<&str> = a.behavior_selectors.iter().map(String::as_str).collect();
    let set_b: BTreeSet<&str> = b.behavior_selectors.iter().map(String::as_str).collect();

    let common: Vec<String> = set_a
        .intersection(&set_b)
        .map(|s| s.to_string())
        .collect();
    let only_in_first: Vec<String> = set_a.difference(&set_b).map(|s| s.to_string()).collect();
    let only_in_second: Vec<String> = set_b.difference(&set_a).map(|s| s.to_string()).collect();

    let denom = set_a.len().max(set_b.len()).max(1);
    let similarity = common.len() as f64 / denom as f64;
    let hash_match = !a.core_hash.is_empty() && a.core_hash == b.core_hash;

    CoreComparison {
        similarity,
        selector_count_diff: set_a.len().abs_diff(set_b.len()),
        common_selectors: common,
        only_in_first,
        only_in_second,
        hash_match,
    }
}
