//! Base grammar validation seam.
//!
//! The extended checks assume a syntactically valid rule, so validation
//! starts with a pluggable base-grammar gate. Callers with a full SIGMA
//! schema validator plug it in through [`BaseGrammarValidator`]; the default
//! [`YamlGrammarValidator`] covers the structural minimum (well-formed YAML,
//! required sections, non-empty condition).

use serde_yaml::Value;

/// Outcome of the base grammar check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl BaseValidation {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Black-box "is this syntactically a valid rule" check.
pub trait BaseGrammarValidator: Send + Sync {
    fn validate_base(&self, rule_text: &str) -> BaseValidation;
}

/// Default base validator: YAML well-formedness plus required sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlGrammarValidator;

impl BaseGrammarValidator for YamlGrammarValidator {
    fn validate_base(&self, rule_text: &str) -> BaseValidation {
        let doc: Value = match serde_yaml::from_str(rule_text) {
            Ok(doc) => doc,
            Err(e) => {
                return BaseValidation::failed(vec![format!("Failed to parse YAML: {e}")]);
            }
        };

        let mut errors = Vec::new();
        if !matches!(doc, Value::Mapping(_)) {
            return BaseValidation::failed(vec![
                "Rule document must be a YAML mapping".to_string()
            ]);
        }

        if doc.get("title").and_then(Value::as_str).is_none() {
            errors.push("Missing required field: title".to_string());
        }
        if doc.get("logsource").is_none() {
            errors.push("Missing required section: logsource".to_string());
        }
        match doc.get("detection") {
            None => errors.push("Missing required section: detection".to_string()),
            Some(detection) => {
                let condition = detection.get("condition").and_then(Value::as_str);
                match condition {
                    None => errors.push("Detection section has no condition".to_string()),
                    Some(c) if c.trim().is_empty() => {
                        errors.push("Condition must be a non-empty string".to_string());
                    }
                    Some(_) => {}
                }
            }
        }

        if errors.is_empty() {
            BaseValidation::ok()
        } else {
            BaseValidation::failed(errors)
        }
    }
}
