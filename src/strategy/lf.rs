//! Logical Form to Prolog text.
//!
//! LF is the richer intermediate form: arguments carry explicit types
//! (`atom`, `variable`, `number`, `term`, `list`) and body goals may be
//! negated. Conversion is deterministic; shapes that don't fit raise
//! `INVALID_LF_STRUCTURE`.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::strategy::term::{format_atom, is_variable};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LfArgument {
    Atom { value: String },
    Variable { name: String },
    Number { value: serde_json::Number },
    Term { value: LfTerm },
    List { elements: Vec<LfArgument> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct LfTerm {
    pub predicate: String,
    #[serde(default)]
    pub arguments: Vec<LfArgument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LfGoal {
    #[serde(flatten)]
    pub term: LfTerm,
    #[serde(default)]
    pub negated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LfRule {
    pub head: LfTerm,
    pub body: Vec<LfGoal>,
}

/// Convert an LF document (object or array of objects) into clauses.
pub fn to_clauses(value: &JsonValue) -> Result<Vec<String>> {
    match value {
        JsonValue::Array(items) => {
            let mut clauses = Vec::new();
            for item in items {
                clauses.push(statement_to_clause(item)?);
            }
            Ok(clauses)
        }
        other => Ok(vec![statement_to_clause(other)?]),
    }
}

fn statement_to_clause(value: &JsonValue) -> Result<String> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::InvalidLfStructure(format!("statement is not an object: {value}")))?;

    match obj.get("statementType").and_then(JsonValue::as_str) {
        Some("fact") => {
            let fact = obj.get("fact").ok_or_else(|| {
                Error::InvalidLfStructure("fact statement missing 'fact'".to_string())
            })?;
            let term: LfTerm = serde_json::from_value(fact.clone())
                .map_err(|e| Error::InvalidLfStructure(format!("malformed fact: {e}")))?;
            Ok(format!("{}.", render_term(&term)?))
        }
        Some("rule") => {
            let rule = obj.get("rule").ok_or_else(|| {
                Error::InvalidLfStructure("rule statement missing 'rule'".to_string())
            })?;
            let rule: LfRule = serde_json::from_value(rule.clone())
                .map_err(|e| Error::InvalidLfStructure(format!("malformed rule: {e}")))?;
            if rule.body.is_empty() {
                return Err(Error::InvalidLfStructure(
                    "rule with an empty body".to_string(),
                ));
            }
            let body = rule
                .body
                .iter()
                .map(render_goal)
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            Ok(format!("{} :- {}.", render_term(&rule.head)?, body))
        }
        Some(other) => Err(Error::InvalidLfStructure(format!(
            "unknown statementType: {other}"
        ))),
        None => Err(Error::InvalidLfStructure(
            "statement missing statementType".to_string(),
        )),
    }
}

fn render_goal(goal: &LfGoal) -> Result<String> {
    let rendered = render_term(&goal.term)?;
    if goal.negated {
        Ok(format!("not({rendered})"))
    } else {
        Ok(rendered)
    }
}

fn render_term(term: &LfTerm) -> Result<String> {
    if term.predicate.is_empty() {
        return Err(Error::InvalidLfStructure("empty predicate".to_string()));
    }
    let predicate = format_atom(&term.predicate);
    if term.arguments.is_empty() {
        return Ok(predicate);
    }
    let args = term
        .arguments
        .iter()
        .map(render_argument)
        .collect::<Result<Vec<_>>>()?
        .join(", ");
    Ok(format!("{predicate}({args})"))
}

fn render_argument(arg: &LfArgument) -> Result<String> {
    match arg {
        LfArgument::Atom { value } => Ok(format_atom(value)),
        LfArgument::Variable { name } => {
            if is_variable(name) {
                Ok(name.clone())
            } else {
                Err(Error::InvalidLfStructure(format!(
                    "invalid variable name: {name}"
                )))
            }
        }
        LfArgument::Number { value } => Ok(value.to_string()),
        LfArgument::Term { value } => render_term(value),
        LfArgument::List { elements } => {
            let items = elements
                .iter()
                .map(render_argument)
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            Ok(format!("[{items}]"))
        }
    }
}
