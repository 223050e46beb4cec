//! Pattern safety checks over detection string leaves.
//!
//! Flags values that match everything, embed artifacts instead of behavior
//! patterns, or combine regex with content regex cannot handle.

use crate::rule::{split_field_expr, Rule};
use base64::engine::general_purpose;
use base64::Engine as _;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default)]
pub(crate) struct PatternReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn base64_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9+/=]{41,}").expect("static pattern"))
}

/// Scan every detection string leaf (condition excluded by construction).
pub(crate) fn check_patterns(rule: &Rule) -> PatternReport {
    let mut report = PatternReport::default();

    rule.visit_detection_leaves(|selection, field_expr, value| {
        let (_, modifiers) = split_field_expr(field_expr);
        let is_regex = modifiers.iter().any(|m| m.eq_ignore_ascii_case("re"));

        if let Some(run) = find_base64_artifact(value) {
            report.errors.push(format!(
                "Selection '{selection}' field '{field_expr}' embeds a {}-char base64 artifact instead of a behavior pattern",
                run.len()
            ));
        }

        if is_wildcard_only(value) {
            report.errors.push(format!(
                "Selection '{selection}' field '{field_expr}' is an unanchored wildcard ('{value}') and matches everything"
            ));
        }

        if value.contains("(.*|.+)") || value.contains("(.+|.*)") {
            report.errors.push(format!(
                "Selection '{selection}' field '{field_expr}' uses a match-all alternation"
            ));
        }

        if is_regex {
            if value.contains('\n') {
                report.errors.push(format!(
                    "Selection '{selection}' field '{field_expr}' combines a multi-line value with the re modifier"
                ));
            }
            let case_insensitive = value.contains("(?i")
                || modifiers.iter().any(|m| m.eq_ignore_ascii_case("i"));
            if !case_insensitive {
                report.warnings.push(format!(
                    "Selection '{selection}' field '{field_expr}' uses a case-sensitive regex; consider (?i)"
                ));
            }
        }
    });

    report
}

/// A base64-shaped run longer than 40 characters that actually decodes.
fn find_base64_artifact(value: &str) -> Option<&str> {
    let candidate = base64_run_regex().find(value)?.as_str();
    let decodes = general_purpose::STANDARD.decode(candidate).is_ok()
        || general_purpose::STANDARD_NO_PAD.decode(candidate).is_ok();
    decodes.then_some(candidate)
}

fn is_wildcard_only(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty()
        && trimmed.chars().all(|c| matches!(c, '*' | '.' | '+'))
        && trimmed.chars().any(|c| matches!(c, '*' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(selection_lines: &str) -> Rule {
        let text =
            format!("title: X\ndetection:\n    selection:\n{selection_lines}    condition: selection\n");
        Rule::from_yaml(&text).unwrap()
    }

    #[test]
    fn test_long_base64_run_is_an_error() {
        // 64 chars of valid base64
        let payload = "A".repeat(64);
        let rule = rule(&format!("        CommandLine|contains: '{payload}'\n"));
        let report = check_patterns(&rule);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("base64 artifact"));
    }

    #[test]
    fn test_short_base64_lookalike_passes() {
        let rule = rule("        CommandLine|contains: 'powershell -enc SGVsbG8='\n");
        let report = check_patterns(&rule);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_wildcard_only_value_is_an_error() {
        for value in ["'*'", "'.*'", "'**'"] {
            let rule = rule(&format!("        CommandLine: {value}\n"));
            let report = check_patterns(&rule);
            assert_eq!(report.errors.len(), 1, "expected error for {value}");
        }
    }

    #[test]
    fn test_dotted_filename_is_not_wildcard_only() {
        let rule = rule("        Image|endswith: '.exe'\n");
        let report = check_patterns(&rule);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_match_all_alternation_is_an_error() {
        let rule = rule("        CommandLine|re: 'cmd(.*|.+)exe'\n");
        let report = check_patterns(&rule);
        assert!(report.errors.iter().any(|e| e.contains("alternation")));
    }

    #[test]
    fn test_multiline_regex_is_an_error() {
        let rule = rule("        CommandLine|re: \"line one\\nline two\"\n");
        let report = check_patterns(&rule);
        assert!(report.errors.iter().any(|e| e.contains("multi-line")));
    }

    #[test]
    fn test_case_sensitive_regex_is_a_warning() {
        let rule = rule("        CommandLine|re: 'schtasks /Create'\n");
        let report = check_patterns(&rule);
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_case_insensitive_regex_passes() {
        let rule = rule("        CommandLine|re: '(?i)schtasks /create'\n");
        let report = check_patterns(&rule);
        assert!(report.warnings.is_empty());
    }
}
