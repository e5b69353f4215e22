//! Execution state for a single strategy run.
//!
//! Values flowing between nodes are heterogeneous but drawn from a small
//! closed set; nodes type-check their inputs against the expected variant
//! and raise `INVALID_NODE_INPUT` on mismatch. The state is exclusively
//! owned by one run and dropped at its end.

use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::prompts::{fill_placeholders, first_unfilled};
use crate::reasoner::{ProofNode, Solution};

/// A value bound to a strategy variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Raw text (LLM output, queries, rendered prompts).
    Text(String),
    /// A parsed JSON tree (SIR/LF payloads, validation verdicts, costs).
    Json(JsonValue),
    /// An array of Prolog clause strings.
    Clauses(Vec<String>),
    /// Reasoner solutions.
    Solutions(Vec<Solution>),
    /// A proof trace.
    Trace(ProofNode),
}

impl Value {
    /// The variant name used in type-mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Json(_) => "json",
            Self::Clauses(_) => "clauses",
            Self::Solutions(_) => "solutions",
            Self::Trace(_) => "trace",
        }
    }

    /// Textual form used when substituted into a `{{placeholder}}`.
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Json(v) => v.to_string(),
            Self::Clauses(c) => c.join("\n"),
            Self::Solutions(s) => serde_json::to_string(s).unwrap_or_else(|_| "[]".to_string()),
            Self::Trace(t) => serde_json::to_string(t).unwrap_or_else(|_| "null".to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

/// Variable environment for one strategy run.
#[derive(Debug, Default)]
pub struct ExecutionState {
    vars: HashMap<String, Value>,
}

impl ExecutionState {
    pub fn new(initial: HashMap<String, Value>) -> Self {
        Self { vars: initial }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Bind a variable, overwriting any prior binding of the same name.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Resolve `{{var}}` placeholders in a node parameter from the current
    /// bindings. A placeholder with no binding is an error naming it.
    pub fn render_template(&self, owner: &str, template: &str) -> Result<String> {
        let vars: HashMap<String, String> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.render()))
            .collect();
        let rendered = fill_placeholders(template, &vars);
        if let Some(placeholder) = first_unfilled(&rendered) {
            return Err(Error::PromptFormatting {
                template: owner.to_string(),
                placeholder,
            });
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_by_variant() {
        assert_eq!(Value::Text("x".into()).render(), "x");
        assert_eq!(Value::Json(json!({"a": 1})).render(), r#"{"a":1}"#);
        assert_eq!(
            Value::Clauses(vec!["a.".into(), "b.".into()]).render(),
            "a.\nb."
        );
        assert_eq!(Value::Solutions(vec![Solution::True]).render(), "[true]");
    }

    #[test]
    fn test_set_overwrites() {
        let mut state = ExecutionState::default();
        state.set("v", Value::Text("one".into()));
        state.set("v", Value::Text("two".into()));
        assert_eq!(state.get("v").and_then(Value::as_text), Some("two"));
    }

    #[test]
    fn test_render_template_substitutes() {
        let mut state = ExecutionState::default();
        state.set("name", Value::Text("socrates".into()));
        state.set("facts", Value::Clauses(vec!["man(socrates).".into()]));
        let out = state
            .render_template("n1", "KB:\n{{facts}}\nWho: {{name}}")
            .unwrap();
        assert_eq!(out, "KB:\nman(socrates).\nWho: socrates");
    }

    #[test]
    fn test_render_template_missing_var() {
        let state = ExecutionState::default();
        let err = state.render_template("n1", "{{missing}}").unwrap_err();
        match err {
            Error::PromptFormatting { placeholder, .. } => assert_eq!(placeholder, "missing"),
            other => panic!("unexpected: {other}"),
        }
    }
}
