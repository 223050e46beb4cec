//! Extended structural validation.
//!
//! Validation runs in two layers: a pluggable base-grammar gate (is this
//! syntactically a SIGMA rule at all), then the extended heuristics —
//! telemetry feasibility, condition cross-checks, selection satisfiability,
//! pattern safety, IOC leakage, and field conformance. The base gate is a
//! hard fail; the extended checks never panic on odd substructure, they
//! simply record what they can prove.
//!
//! Sub-modules:
//! - [`grammar`] - base-grammar seam and default YAML validator
//! - [`condition`] - condition tokenization and cross-checks
//! - [`telemetry`] - logsource coherence and field allow-lists
//! - [`selection`] - impossible-selection detection
//! - [`patterns`] - pattern safety scanning
//! - [`ioc`] - indicator leakage scanning

pub mod grammar;

pub(crate) mod condition;
pub(crate) mod ioc;
pub(crate) mod patterns;
pub(crate) mod selection;
pub(crate) mod telemetry;

pub use grammar::{BaseGrammarValidator, BaseValidation, YamlGrammarValidator};

use crate::rule::{split_field_expr, Rule, SelectionValue};
use serde::Serialize;
use telemetry::TelemetryFit;

/// Immutable result of one validation call.
///
/// `final_pass` is the logical AND of every boolean sub-result with
/// `ioc_leakage` inverted; it is computed at construction and the record is
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtendedValidationResult {
    pub base_grammar_passed: bool,
    pub telemetry_feasible: bool,
    pub condition_valid: bool,
    pub pattern_safe: bool,
    /// true means indicators leaked, which is a failure condition.
    pub ioc_leakage: bool,
    pub field_conformance: bool,
    pub selection_feasible: bool,
    pub final_pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Mutable scratch state while the checks run; sealed into the immutable
/// result at the end.
#[derive(Debug)]
struct Checks {
    base_grammar_passed: bool,
    telemetry_feasible: bool,
    condition_valid: bool,
    pattern_safe: bool,
    ioc_leakage: bool,
    field_conformance: bool,
    selection_feasible: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Checks {
    fn new() -> Self {
        Self {
            base_grammar_passed: true,
            telemetry_feasible: true,
            condition_valid: true,
            pattern_safe: true,
            ioc_leakage: false,
            field_conformance: true,
            selection_feasible: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn finish(self) -> ExtendedValidationResult {
        let final_pass = self.base_grammar_passed
            && self.telemetry_feasible
            && self.condition_valid
            && self.pattern_safe
            && !self.ioc_leakage
            && self.field_conformance
            && self.selection_feasible;
        ExtendedValidationResult {
            base_grammar_passed: self.base_grammar_passed,
            telemetry_feasible: self.telemetry_feasible,
            condition_valid: self.condition_valid,
            pattern_safe: self.pattern_safe,
            ioc_leakage: self.ioc_leakage,
            field_conformance: self.field_conformance,
            selection_feasible: self.selection_feasible,
            final_pass,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

/// Multi-stage structural validator.
///
/// # Examples
///
/// ```rust
/// use sigma_eval::StructuralValidator;
///
/// let validator = StructuralValidator::new();
/// let result = validator.validate(r#"
/// title: Scheduled Task Creation
/// logsource:
///     category: process_creation
///     product: windows
/// detection:
///     selection:
///         CommandLine|contains: 'schtasks /create'
///     condition: selection
/// "#);
/// assert!(result.final_pass);
/// ```
pub struct StructuralValidator {
    base: Box<dyn BaseGrammarValidator>,
}

impl StructuralValidator {
    /// Create a validator backed by the default [`YamlGrammarValidator`].
    pub fn new() -> Self {
        Self {
            base: Box::new(YamlGrammarValidator),
        }
    }

    /// Create a validator backed by a caller-supplied base grammar check.
    pub fn with_base_validator(base: Box<dyn BaseGrammarValidator>) -> Self {
        Self { base }
    }

    /// Run the full validation pipeline over one rule text.
    pub fn validate(&self, rule_text: &str) -> ExtendedValidationResult {
        let mut checks = Checks::new();

        let base = self.base.validate_base(rule_text);
        if !base.is_valid {
            checks.base_grammar_passed = false;
            checks.errors = base.errors;
            return checks.finish();
        }

        // The base gate passed; if our own parse still fails the extended
        // checks have nothing to work with.
        let rule = match Rule::from_yaml(rule_text) {
            Ok(rule) => rule,
            Err(e) => {
                checks.base_grammar_passed = false;
                checks.errors.push(e.to_string());
                return checks.finish();
            }
        };

        self.check_telemetry(&rule, &mut checks);
        self.check_condition(&rule, &mut checks);
        self.check_selections(&rule, &mut checks);
        self.check_patterns(&rule, &mut checks);
        self.check_ioc(&rule, &mut checks);
        self.check_field_conformance(&rule, &mut checks);

        checks.finish()
    }

    fn check_telemetry(&self, rule: &Rule, checks: &mut Checks) {
        match telemetry::classify_logsource(&rule.logsource) {
            TelemetryFit::Known => {}
            TelemetryFit::Incomplete => {
                checks
                    .warnings
                    .push("Logsource category or product missing".to_string());
            }
            TelemetryFit::UnknownCategory => {
                checks.warnings.push(format!(
                    "Logsource category '{}' is not in the feasibility table",
                    rule.logsource.category.as_deref().unwrap_or("")
                ));
            }
            TelemetryFit::Incoherent => {
                checks.telemetry_feasible = false;
                checks.errors.push(format!(
                    "No telemetry source provides category '{}' on product '{}'",
                    rule.logsource.category.as_deref().unwrap_or(""),
                    rule.logsource.product.as_deref().unwrap_or("")
                ));
            }
        }
    }

    fn check_condition(&self, rule: &Rule, checks: &mut Checks) {
        let names: Vec<String> = rule
            .detection
            .selections
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        let analysis = condition::analyze_condition(&rule.detection.condition, &names);

        if let Some(name) = &analysis.tautology {
            checks.condition_valid = false;
            checks.errors.push(format!(
                "Condition is a tautology: '{name} or not {name}' matches every event"
            ));
        }
        for name in &analysis.undefined_references {
            checks.warnings.push(format!(
                "Condition references undefined selection '{name}'"
            ));
        }
        for name in &analysis.unused_selections {
            checks
                .warnings
                .push(format!("Selection '{name}' is never referenced in condition"));
        }
    }

    fn check_selections(&self, rule: &Rule, checks: &mut Checks) {
        let errors = selection::find_impossible_selections(rule);
        if !errors.is_empty() {
            checks.selection_feasible = false;
            checks.errors.extend(errors);
        }
    }

    fn check_patterns(&self, rule: &Rule, checks: &mut Checks) {
        let report = patterns::check_patterns(rule);
        if !report.errors.is_empty() {
            checks.pattern_safe = false;
            checks.errors.extend(report.errors);
        }
        checks.warnings.extend(report.warnings);
    }

    fn check_ioc(&self, rule: &Rule, checks: &mut Checks) {
        let report = ioc::check_ioc_leakage(rule);
        checks.ioc_leakage = report.leakage;
        checks.errors.extend(report.errors);
        checks.warnings.extend(report.warnings);
    }

    fn check_field_conformance(&self, rule: &Rule, checks: &mut Checks) {
        if !telemetry::is_windows_process_creation(&rule.logsource) {
            return;
        }
        for (name, body) in &rule.detection.selections {
            for field_expr in collect_field_keys(body) {
                let (base, _) = split_field_expr(&field_expr);
                if !telemetry::is_allowed_process_creation_field(base) {
                    checks.field_conformance = false;
                    checks.errors.push(format!(
                        "Selection '{name}' uses field '{base}', which Windows process-creation telemetry does not emit"
                    ));
                }
            }
        }
    }
}

impl Default for StructuralValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_field_keys(body: &SelectionValue) -> Vec<String> {
    let mut keys = Vec::new();
    if let SelectionValue::Map(entries) = body {
        for (key, nested) in entries {
            keys.push(key.clone());
            keys.extend(collect_field_keys(nested));
        }
    }
    keys
}
