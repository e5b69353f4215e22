//! Reasoner result types.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// One solution of a query.
///
/// Serializes as the JSON literal `true` for a bare success, or as an
/// object mapping variable names to the textual form of their bound terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solution {
    /// Goal succeeded with no variable bindings.
    True,
    /// Variable name -> bound term text. Anonymous (`_`-leading) variables
    /// are never present.
    Bindings(BTreeMap<String, String>),
}

impl Solution {
    /// Build a solution from a binding map, normalizing the empty map to
    /// the `True` sentinel and dropping anonymous variables.
    pub fn from_bindings(bindings: BTreeMap<String, String>) -> Self {
        let bindings: BTreeMap<String, String> = bindings
            .into_iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .collect();
        if bindings.is_empty() {
            Self::True
        } else {
            Self::Bindings(bindings)
        }
    }
}

impl Serialize for Solution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::True => serializer.serialize_bool(true),
            Self::Bindings(map) => {
                let mut ser = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    ser.serialize_entry(k, v)?;
                }
                ser.end()
            }
        }
    }
}

/// Options for a consult-and-query call.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Maximum number of solutions to enumerate.
    pub limit: usize,
    /// Capture a proof trace alongside the solutions.
    pub trace: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            trace: false,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// Result of a consult-and-query call.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    /// Up to `limit` solutions, possibly truncated by the step budget.
    pub solutions: Vec<Solution>,
    /// Proof trace for the first solution, when requested and available.
    pub trace: Option<ProofNode>,
    /// Whether the engine's step budget cut enumeration short.
    pub limit_exceeded: bool,
}

/// Result of a validation-only consult.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// One node of a proof trace: the goal's formatted term with the bindings
/// at that step substituted, plus its ordered subgoals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofNode {
    pub goal: String,
    pub children: Vec<ProofNode>,
}

impl ProofNode {
    pub fn leaf(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            children: Vec::new(),
        }
    }
}
