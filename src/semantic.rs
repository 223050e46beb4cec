//! Semantic equivalence scoring.
//!
//! Compares a generated rule against a reference through one of two
//! pluggable strategies: an LLM judge that can enumerate behavioral
//! differences, or an embedding comparison that can only measure distance.
//! The judge is preferred, the embedding is the fallback, and when neither
//! capability is available the scorer degrades to a neutral result instead
//! of failing the pipeline.

use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// LLM judge capability. Implementations own their transport and timeout
/// policy; any `Err` triggers the embedding fallback.
pub trait JudgeCapability: Send + Sync {
    fn judge(&self, prompt: &str) -> Result<String>;
}

/// Text embedding capability.
pub trait EmbeddingCapability: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Which strategy produced a comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticMethod {
    Judge,
    Embedding,
    /// No capability was available; the result is a neutral placeholder.
    Neutral,
}

/// Semantic comparison between a generated rule and a reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticComparisonResult {
    /// 0.0 (unrelated) to 1.0 (equivalent).
    pub similarity_score: f64,
    pub missing_behaviors: usize,
    pub extraneous_behaviors: usize,
    pub missing_details: Vec<String>,
    pub extraneous_details: Vec<String>,
    pub method: SemanticMethod,
}

impl SemanticComparisonResult {
    fn neutral() -> Self {
        Self {
            similarity_score: 0.5,
            missing_behaviors: 0,
            extraneous_behaviors: 0,
            missing_details: Vec::new(),
            extraneous_details: Vec::new(),
            method: SemanticMethod::Neutral,
        }
    }
}

/// Strategy-dispatching semantic scorer.
pub struct SemanticScorer {
    judge: Option<Box<dyn JudgeCapability>>,
    embedder: Option<Box<dyn EmbeddingCapability>>,
}

impl SemanticScorer {
    /// A scorer with no capabilities; always returns the neutral result.
    pub fn new() -> Self {
        Self {
            judge: None,
            embedder: None,
        }
    }

    pub fn with_judge(mut self, judge: Box<dyn JudgeCapability>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingCapability>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Compare two rule texts. Never fails: strategy errors degrade through
    /// the fallback chain down to the neutral result.
    pub fn compare_rules(&self, generated: &str, reference: &str) -> SemanticComparisonResult {
        if let Some(judge) = &self.judge {
            match self.compare_via_judge(judge.as_ref(), generated, reference) {
                Some(result) => return result,
                None => warn!("judge comparison failed, falling back to embedding strategy"),
            }
        }

        if let Some(embedder) = &self.embedder {
            match self.compare_via_embedding(embedder.as_ref(), generated, reference) {
                Some(result) => return result,
                None => warn!("embedding comparison failed, returning neutral result"),
            }
        }

        SemanticComparisonResult::neutral()
    }

    fn compare_via_judge(
        &self,
        judge: &dyn JudgeCapability,
        generated: &str,
        reference: &str,
    ) -> Option<SemanticComparisonResult> {
        let prompt = build_judge_prompt(generated, reference);
        let response = judge.judge(&prompt).ok()?;
        let json = first_json_object(&response)?;
        let parsed: Value = serde_json::from_str(json).ok()?;

        let similarity = parsed.get("similarity_score")?.as_f64()?.clamp(0.0, 1.0);
        let (missing, missing_details) = extract_behaviors(parsed.get("missing_behaviors"));
        let (extraneous, extraneous_details) = extract_behaviors(parsed.get("extraneous_behaviors"));

        Some(SemanticComparisonResult {
            similarity_score: similarity,
            missing_behaviors: missing,
            extraneous_behaviors: extraneous,
            missing_details,
            extraneous_details,
            method: SemanticMethod::Judge,
        })
    }

    fn compare_via_embedding(
        &self,
        embedder: &dyn EmbeddingCapability,
        generated: &str,
        reference: &str,
    ) -> Option<SemanticComparisonResult> {
        let a = embedder.embed(generated).ok()?;
        let b = embedder.embed(reference).ok()?;
        let similarity = cosine_similarity(&a, &b).clamp(0.0, 1.0);

        // Embeddings cannot enumerate differences; estimate counts from the
        // distance instead.
        let missing = ((1.0 - similarity) * 3.0).round() as usize;
        let extraneous = ((1.0 - similarity) * 2.0).round() as usize;

        Some(SemanticComparisonResult {
            similarity_score: similarity,
            missing_behaviors: missing,
            extraneous_behaviors: extraneous,
            missing_details: Vec::new(),
            extraneous_details: Vec::new(),
            method: SemanticMethod::Embedding,
        })
    }
}

impl Default for SemanticScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn build_judge_prompt(generated: &str, reference: &str) -> String {
    format!(
        "You are comparing two SIGMA detection rules for behavioral equivalence.\n\
         Respond with a single JSON object with these keys:\n\
         - similarity_score: float from 0.0 to 1.0\n\
         - missing_behaviors: list of behaviors the reference detects but the generated rule does not\n\
         - extraneous_behaviors: list of behaviors the generated rule detects but the reference does not\n\
         \n\
         GENERATED RULE:\n{generated}\n\nREFERENCE RULE:\n{reference}\n"
    )
}

/// Find the first balanced `{...}` object in a response that may wrap the
/// JSON in prose.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Behaviors may arrive as a list of strings or as a bare count.
fn extract_behaviors(value: Option<&Value>) -> (usize, Vec<String>) {
    match value {
        Some(Value::Array(items)) => {
            let details: Vec<String> = items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            (details.len(), details)
        }
        Some(Value::Number(n)) => (n.as_u64().unwrap_or(0) as usize, Vec::new()),
        _ => (0, Vec::new()),
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len().min(b.len());
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for i in 0..len {
        dot += a[i] as f64 * b[i] as f64;
        norm_a += (a[i] as f64).powi(2);
        norm_b += (b[i] as f64).powi(2);
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
