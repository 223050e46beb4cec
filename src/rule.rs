//! Parsed SIGMA rule model.
//!
//! Rules arrive as YAML text from a generator and are walked as
//! [`serde_yaml::Value`] trees rather than deserialized into a rigid schema:
//! detection blocks are free-form mappings whose scalars may be strings,
//! numbers, or booleans, and every downstream check wants them as strings.
//! Parsing stringifies scalars once so the validators and the fingerprinter
//! share a single representation.

use crate::error::{EvalError, Result};
use serde_yaml::Value;

/// Log source triple from a rule's `logsource` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Logsource {
    pub category: Option<String>,
    pub product: Option<String>,
    pub service: Option<String>,
}

/// A value inside a selection block, with scalars already stringified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionValue {
    Scalar(String),
    List(Vec<SelectionValue>),
    Map(Vec<(String, SelectionValue)>),
}

/// The `detection` block: named selections plus the condition expression.
///
/// Selection order is preserved from the YAML document so that selector
/// extraction is deterministic for a given rule text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub selections: Vec<(String, SelectionValue)>,
    pub condition: String,
    pub timeframe: Option<String>,
}

/// A parsed SIGMA rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub title: String,
    pub id: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub logsource: Logsource,
    pub detection: Detection,
    pub level: Option<String>,
}

impl Rule {
    /// Parse a rule from YAML text.
    ///
    /// Fails when the text is not valid YAML, when the `detection` section is
    /// missing, or when `detection.condition` is absent or empty. Everything
    /// else is optional; unknown top-level keys are ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sigma_eval::Rule;
    ///
    /// let rule = Rule::from_yaml(r#"
    /// title: Suspicious Scheduled Task
    /// logsource:
    ///     category: process_creation
    ///     product: windows
    /// detection:
    ///     selection:
    ///         CommandLine|contains: 'schtasks'
    ///     condition: selection
    /// "#)?;
    /// assert_eq!(rule.title, "Suspicious Scheduled Task");
    /// assert_eq!(rule.detection.condition, "selection");
    /// # Ok::<(), sigma_eval::EvalError>(())
    /// ```
    pub fn from_yaml(rule_text: &str) -> Result<Rule> {
        let doc: Value = serde_yaml::from_str(rule_text)
            .map_err(|e| EvalError::YamlError(format!("Failed to parse YAML: {e}")))?;

        let title = doc
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let id = doc.get("id").and_then(Value::as_str).map(str::to_string);
        let description = doc
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        let level = doc.get("level").and_then(Value::as_str).map(str::to_string);

        let tags = match doc.get("tags") {
            Some(Value::Sequence(seq)) => seq
                .iter()
                .filter_map(|v| stringify_scalar(v))
                .collect(),
            _ => Vec::new(),
        };

        let logsource = parse_logsource(doc.get("logsource"));
        let detection = parse_detection(doc.get("detection"))?;

        Ok(Rule {
            title,
            id,
            description,
            tags,
            logsource,
            detection,
            level,
        })
    }

    /// Visit every scalar leaf in the detection block (condition and
    /// timeframe excluded), yielding `(selection_name, field_expr, value)`.
    ///
    /// For nested mappings the nearest map key is reported as the field
    /// expression; bare keyword lists report the field as `keywords`.
    pub fn visit_detection_leaves<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &str, &str),
    {
        for (name, body) in &self.detection.selections {
            visit_value(name, "keywords", body, &mut visit);
        }
    }
}

fn visit_value<F>(selection: &str, field: &str, value: &SelectionValue, visit: &mut F)
where
    F: FnMut(&str, &str, &str),
{
    match value {
        SelectionValue::Scalar(s) => visit(selection, field, s),
        SelectionValue::List(items) => {
            for item in items {
                visit_value(selection, field, item, visit);
            }
        }
        SelectionValue::Map(entries) => {
            for (key, nested) in entries {
                visit_value(selection, key, nested, visit);
            }
        }
    }
}

/// Split a selection key into its base field name and modifier chain,
/// e.g. `CommandLine|contains|all` → (`CommandLine`, `["contains", "all"]`).
pub fn split_field_expr(field_expr: &str) -> (&str, Vec<&str>) {
    let mut parts = field_expr.split('|');
    let base = parts.next().unwrap_or(field_expr);
    (base, parts.collect())
}

fn parse_logsource(value: Option<&Value>) -> Logsource {
    let Some(Value::Mapping(map)) = value else {
        return Logsource::default();
    };
    let mut logsource = Logsource::default();
    for (key, val) in map {
        let (Some(key), Some(val)) = (key.as_str(), val.as_str()) else {
            continue;
        };
        match key {
            "category" => logsource.category = Some(val.to_string()),
            "product" => logsource.product = Some(val.to_string()),
            "service" => logsource.service = Some(val.to_string()),
            _ => {}
        }
    }
    logsource
}

fn parse_detection(value: Option<&Value>) -> Result<Detection> {
    let Some(Value::Mapping(map)) = value else {
        return Err(EvalError::InvalidRule(
            "Missing detection section".to_string(),
        ));
    };

    let mut selections = Vec::new();
    let mut condition = None;
    let mut timeframe = None;

    for (key, body) in map {
        let Some(key_str) = key.as_str() else {
            continue;
        };
        match key_str {
            "condition" => condition = body.as_str().map(str::to_string),
            "timeframe" => timeframe = stringify_scalar(body),
            _ => selections.push((key_str.to_string(), convert_value(body))),
        }
    }

    let condition = condition
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| EvalError::InvalidRule("Missing or empty condition".to_string()))?;

    Ok(Detection {
        selections,
        condition,
        timeframe,
    })
}

fn convert_value(value: &Value) -> SelectionValue {
    match value {
        Value::Sequence(seq) => SelectionValue::List(seq.iter().map(convert_value).collect()),
        Value::Mapping(map) => SelectionValue::Map(
            map.iter()
                .filter_map(|(k, v)| k.as_str().map(|key| (key.to_string(), convert_value(v))))
                .collect(),
        ),
        other => SelectionValue::Scalar(stringify_scalar(other).unwrap_or_default()),
    }
}

fn stringify_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}
