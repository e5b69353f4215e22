//! Structured Intermediate Representation to Prolog text.
//!
//! SIR describes a statement at the predicate/argument level:
//!
//! ```json
//! {"statementType": "fact", "fact": {"predicate": "man", "arguments": ["socrates"]}}
//! {"statementType": "rule", "rule": {"head": {...}, "body": [{...}]}}
//! ```
//!
//! Unknown statement types (`comment` and friends) convert to zero
//! clauses — "nothing to assert" — rather than erroring.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::strategy::term::{format_argument, format_atom};

#[derive(Debug, Clone, Deserialize)]
pub struct SirAtom {
    pub predicate: String,
    #[serde(default)]
    pub arguments: Vec<SirArgument>,
}

/// Arguments arrive as strings or numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SirArgument {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SirRule {
    pub head: SirAtom,
    #[serde(default)]
    pub body: Vec<SirAtom>,
}

/// Convert a SIR document (object or array of objects) into clauses.
pub fn to_clauses(value: &JsonValue) -> Result<Vec<String>> {
    match value {
        JsonValue::Array(items) => {
            let mut clauses = Vec::new();
            for item in items {
                clauses.extend(statement_to_clauses(item)?);
            }
            Ok(clauses)
        }
        other => statement_to_clauses(other),
    }
}

fn statement_to_clauses(value: &JsonValue) -> Result<Vec<String>> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::Internal(format!("SIR statement is not an object: {value}")))?;

    let statement_type = obj
        .get("statementType")
        .and_then(JsonValue::as_str)
        .unwrap_or("");

    match statement_type {
        "fact" => {
            let fact = obj
                .get("fact")
                .cloned()
                .ok_or_else(|| Error::Internal("SIR fact statement missing 'fact'".to_string()))?;
            let atom: SirAtom = serde_json::from_value(fact)
                .map_err(|e| Error::Internal(format!("malformed SIR fact: {e}")))?;
            Ok(vec![format!("{}.", render_atom(&atom))])
        }
        "rule" => {
            let rule = obj
                .get("rule")
                .cloned()
                .ok_or_else(|| Error::Internal("SIR rule statement missing 'rule'".to_string()))?;
            let rule: SirRule = serde_json::from_value(rule)
                .map_err(|e| Error::Internal(format!("malformed SIR rule: {e}")))?;
            if rule.body.is_empty() {
                return Ok(vec![format!("{}.", render_atom(&rule.head))]);
            }
            let body = rule
                .body
                .iter()
                .map(render_atom)
                .collect::<Vec<_>>()
                .join(", ");
            Ok(vec![format!("{} :- {}.", render_atom(&rule.head), body)])
        }
        other => {
            tracing::debug!(statement_type = other, "SIR statement yields no clauses");
            Ok(Vec::new())
        }
    }
}

fn render_atom(atom: &SirAtom) -> String {
    let predicate = format_atom(&atom.predicate);
    if atom.arguments.is_empty() {
        return predicate;
    }
    let args = atom
        .arguments
        .iter()
        .map(|arg| match arg {
            SirArgument::Text(s) => format_argument(s),
            SirArgument::Number(n) => n.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{predicate}({args})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fact_conversion() {
        let sir = json!({
            "statementType": "fact",
            "fact": {"predicate": "man", "arguments": ["socrates"]}
        });
        assert_eq!(to_clauses(&sir).unwrap(), vec!["man(socrates)."]);
    }

    #[test]
    fn test_rule_conversion() {
        let sir = json!({
            "statementType": "rule",
            "rule": {
                "head": {"predicate": "mortal", "arguments": ["X"]},
                "body": [
                    {"predicate": "man", "arguments": ["X"]},
                    {"predicate": "alive", "arguments": ["X"]}
                ]
            }
        });
        assert_eq!(
            to_clauses(&sir).unwrap(),
            vec!["mortal(X) :- man(X), alive(X)."]
        );
    }

    #[test]
    fn test_array_of_statements() {
        let sir = json!([
            {"statementType": "fact", "fact": {"predicate": "a", "arguments": ["x"]}},
            {"statementType": "comment", "text": "ignored"},
            {"statementType": "fact", "fact": {"predicate": "b", "arguments": []}}
        ]);
        assert_eq!(to_clauses(&sir).unwrap(), vec!["a(x).", "b."]);
    }

    #[test]
    fn test_unknown_statement_type_is_empty() {
        let sir = json!({"statementType": "comment", "text": "hello"});
        assert!(to_clauses(&sir).unwrap().is_empty());
    }

    #[test]
    fn test_arguments_are_quoted_when_needed() {
        let sir = json!({
            "statementType": "fact",
            "fact": {"predicate": "lives_in", "arguments": ["Alice K", "New York"]}
        });
        // Uppercase-with-space is not a variable, so it quotes.
        assert_eq!(
            to_clauses(&sir).unwrap(),
            vec!["lives_in('Alice K', 'New York')."]
        );
    }

    #[test]
    fn test_numeric_arguments() {
        let sir = json!({
            "statementType": "fact",
            "fact": {"predicate": "age", "arguments": ["socrates", 70]}
        });
        assert_eq!(to_clauses(&sir).unwrap(), vec!["age(socrates, 70)."]);
    }

    #[test]
    fn test_malformed_fact_errors() {
        let sir = json!({"statementType": "fact"});
        assert!(to_clauses(&sir).is_err());
        let sir = json!({"statementType": "fact", "fact": {"arguments": []}});
        assert!(to_clauses(&sir).is_err());
    }
}
