//! Condition expression heuristics.
//!
//! Tokenizes the `condition` string and cross-checks it against the declared
//! selections. This is deliberately a tokenizer, not a boolean-expression
//! solver: undefined references and unused selections surface as warnings,
//! and the tautology check only recognizes the literal `X or not X` shape.

/// Tokens in a SIGMA condition expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Identifier(String),
    And,
    Or,
    Not,
    LeftParen,
    RightParen,
    Of,
    Them,
    All,
    Number(u32),
    Wildcard(String),
}

/// Outcome of the condition cross-checks.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConditionAnalysis {
    pub tautology: Option<String>,
    pub undefined_references: Vec<String>,
    pub unused_selections: Vec<String>,
}

impl ConditionAnalysis {
    pub fn is_valid(&self) -> bool {
        self.tautology.is_none()
    }
}

/// Tokenize a condition expression, skipping characters the grammar does not
/// know about rather than failing (these checks are heuristic).
pub(crate) fn tokenize_condition(condition: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = condition.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' | '\t' | '\n' => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LeftParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RightParen);
                chars.next();
            }
            '0'..='9' => {
                let mut number_str = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() {
                        number_str.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Ok(num) = number_str.parse::<u32>() {
                    tokens.push(Token::Number(num));
                }
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut identifier = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' || ch == '*' {
                        identifier.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }

                match identifier.as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "not" => tokens.push(Token::Not),
                    "of" => tokens.push(Token::Of),
                    "them" => tokens.push(Token::Them),
                    "all" => tokens.push(Token::All),
                    _ => {
                        if identifier.contains('*') {
                            tokens.push(Token::Wildcard(identifier));
                        } else {
                            tokens.push(Token::Identifier(identifier));
                        }
                    }
                }
            }
            _ => {
                chars.next();
            }
        }
    }

    tokens
}

/// Cross-check a condition against the declared selection names.
pub(crate) fn analyze_condition(condition: &str, selection_names: &[String]) -> ConditionAnalysis {
    let tokens = tokenize_condition(condition);
    let mut analysis = ConditionAnalysis::default();

    let mut referenced: Vec<&str> = Vec::new();
    let mut references_all = false;

    for token in &tokens {
        match token {
            Token::Identifier(name) => {
                referenced.push(name);
                if !selection_names.iter().any(|s| s == name) {
                    analysis.undefined_references.push(name.clone());
                }
            }
            Token::Wildcard(pattern) => {
                if selection_names.iter().any(|s| wildcard_match(pattern, s)) {
                    references_all = references_all
                        || selection_names.iter().all(|s| wildcard_match(pattern, s));
                    referenced.push(pattern);
                } else {
                    analysis.undefined_references.push(pattern.clone());
                }
            }
            Token::Them => references_all = true,
            _ => {}
        }
    }

    if !references_all {
        for name in selection_names {
            let used = tokens.iter().any(|t| match t {
                Token::Identifier(id) => id == name,
                Token::Wildcard(pattern) => wildcard_match(pattern, name),
                _ => false,
            });
            if !used {
                analysis.unused_selections.push(name.clone());
            }
        }
    }

    analysis.tautology = find_tautology(&tokens);
    analysis
}

/// Literal `X or not X` (or `not X or X`) over the same identifier.
fn find_tautology(tokens: &[Token]) -> Option<String> {
    for window in tokens.windows(4) {
        if let [Token::Identifier(a), Token::Or, Token::Not, Token::Identifier(b)] = window {
            if a == b {
                return Some(a.clone());
            }
        }
        if let [Token::Not, Token::Identifier(a), Token::Or, Token::Identifier(b)] = window {
            if a == b {
                return Some(a.clone());
            }
        }
    }
    None
}

fn wildcard_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut remainder = name;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !remainder.starts_with(part) {
                return false;
            }
            remainder = &remainder[part.len()..];
        } else if let Some(pos) = remainder.find(part) {
            remainder = &remainder[pos + part.len()..];
        } else {
            return false;
        }
    }
    // A trailing literal must sit at the end of the name.
    match parts.last() {
        Some(last) if !last.is_empty() && !pattern.ends_with('*') => name.ends_with(last),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tokenize_basic_condition() {
        let tokens = tokenize_condition("selection and not filter");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("selection".to_string()),
                Token::And,
                Token::Not,
                Token::Identifier("filter".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_quantified_condition() {
        let tokens = tokenize_condition("1 of selection_* and all of them");
        assert!(tokens.contains(&Token::Number(1)));
        assert!(tokens.contains(&Token::Wildcard("selection_*".to_string())));
        assert!(tokens.contains(&Token::All));
        assert!(tokens.contains(&Token::Them));
    }

    #[test]
    fn test_tautology_detected() {
        let analysis = analyze_condition("selection or not selection", &names(&["selection"]));
        assert_eq!(analysis.tautology.as_deref(), Some("selection"));
        assert!(!analysis.is_valid());
    }

    #[test]
    fn test_reversed_tautology_detected() {
        let analysis = analyze_condition("not selection or selection", &names(&["selection"]));
        assert!(analysis.tautology.is_some());
    }

    #[test]
    fn test_distinct_selections_are_not_tautological() {
        let analysis = analyze_condition(
            "selection1 and selection2",
            &names(&["selection1", "selection2"]),
        );
        assert!(analysis.is_valid());
        assert!(analysis.undefined_references.is_empty());
        assert!(analysis.unused_selections.is_empty());
    }

    #[test]
    fn test_undefined_reference_is_reported() {
        let analysis = analyze_condition("selection and missing", &names(&["selection"]));
        assert_eq!(analysis.undefined_references, vec!["missing"]);
    }

    #[test]
    fn test_unused_selection_is_reported() {
        let analysis = analyze_condition("selection", &names(&["selection", "spare"]));
        assert_eq!(analysis.unused_selections, vec!["spare"]);
    }

    #[test]
    fn test_them_marks_everything_used() {
        let analysis = analyze_condition("1 of them", &names(&["sel_a", "sel_b"]));
        assert!(analysis.unused_selections.is_empty());
    }

    #[test]
    fn test_wildcard_reference_covers_matching_selections() {
        let analysis = analyze_condition(
            "all of selection_*",
            &names(&["selection_img", "selection_cmd"]),
        );
        assert!(analysis.undefined_references.is_empty());
        assert!(analysis.unused_selections.is_empty());
    }
}
