//! Impossible-selection detection.
//!
//! Fields that carry at most one value per log event (`Image`, `User`, ...)
//! cannot be pinned to two different values by identity-style constraints
//! inside a single selection block. Substring constraints (`contains`) and
//! list values carry any-of semantics and are exempt.

use crate::rule::{split_field_expr, Rule, SelectionValue};

/// Fields that take exactly one value per event.
const SINGLE_VALUED_FIELDS: &[&str] = &[
    "Image",
    "ParentImage",
    "ProcessId",
    "ParentProcessId",
    "User",
    "IntegrityLevel",
    "CurrentDirectory",
    "LogonId",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentityKind {
    Equals,
    EndsWith,
    StartsWith,
}

#[derive(Debug)]
struct Constraint {
    kind: IdentityKind,
    value: String,
}

/// Scan every selection block for constraints no real event can satisfy.
/// Returns one error string per infeasible selection.
pub(crate) fn find_impossible_selections(rule: &Rule) -> Vec<String> {
    let mut errors = Vec::new();

    for (name, body) in &rule.detection.selections {
        let SelectionValue::Map(entries) = body else {
            continue;
        };

        // base field (lowercased) -> identity constraints seen in this block
        let mut per_field: Vec<(String, Vec<Constraint>)> = Vec::new();
        for (field_expr, value) in entries {
            let SelectionValue::Scalar(scalar) = value else {
                continue;
            };
            let (base, modifiers) = split_field_expr(field_expr);
            if !SINGLE_VALUED_FIELDS
                .iter()
                .any(|f| f.eq_ignore_ascii_case(base))
            {
                continue;
            }
            let Some(kind) = identity_kind(&modifiers) else {
                continue;
            };
            let key = base.to_lowercase();
            let constraint = Constraint {
                kind,
                value: scalar.to_lowercase(),
            };
            match per_field.iter_mut().find(|(f, _)| *f == key) {
                Some((_, list)) => list.push(constraint),
                None => per_field.push((key, vec![constraint])),
            }
        }

        for (field, constraints) in &per_field {
            if let Some((a, b)) = find_conflict(constraints) {
                errors.push(format!(
                    "Selection '{name}' is unsatisfiable: field '{field}' is pinned to both '{a}' and '{b}'"
                ));
            }
        }
    }

    errors
}

fn identity_kind(modifiers: &[&str]) -> Option<IdentityKind> {
    if modifiers.is_empty() {
        return Some(IdentityKind::Equals);
    }
    if modifiers.iter().any(|m| m.eq_ignore_ascii_case("contains")) {
        return None;
    }
    if modifiers.iter().any(|m| m.eq_ignore_ascii_case("endswith")) {
        return Some(IdentityKind::EndsWith);
    }
    if modifiers
        .iter()
        .any(|m| m.eq_ignore_ascii_case("startswith"))
    {
        return Some(IdentityKind::StartsWith);
    }
    None
}

fn find_conflict(constraints: &[Constraint]) -> Option<(String, String)> {
    for (i, a) in constraints.iter().enumerate() {
        for b in &constraints[i + 1..] {
            if conflicts(a, b) {
                return Some((a.value.clone(), b.value.clone()));
            }
        }
    }
    None
}

fn conflicts(a: &Constraint, b: &Constraint) -> bool {
    use IdentityKind::*;
    match (a.kind, b.kind) {
        // The same affix or equality cannot hold for two different values.
        (Equals, Equals) | (EndsWith, EndsWith) | (StartsWith, StartsWith) => a.value != b.value,
        // Equality must satisfy a co-occurring affix constraint.
        (Equals, EndsWith) => !a.value.ends_with(&b.value),
        (EndsWith, Equals) => !b.value.ends_with(&a.value),
        (Equals, StartsWith) => !a.value.starts_with(&b.value),
        (StartsWith, Equals) => !b.value.starts_with(&a.value),
        // startswith + endswith constrain different ends.
        (EndsWith, StartsWith) | (StartsWith, EndsWith) => false,
    }
}
