//! Strategy definitions: typed dataflow graphs over a closed node set.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};

/// A translation strategy: a DAG of typed nodes plus the variable whose
/// final binding is the strategy's result.
///
/// Definitions are shared-immutable after load; the registry hands out
/// `Arc<Strategy>` and addresses them by id or by content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub name: String,
    pub nodes: Vec<StrategyNode>,
    #[serde(default)]
    pub edges: Vec<StrategyEdge>,
    pub result_variable: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyNode {
    pub id: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// The closed set of node types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// Render prompts, call the LLM adapter, bind the text (and
    /// optionally the opaque cost object) to outputs.
    #[serde(rename = "LLM_Call")]
    LlmCall {
        system_prompt: String,
        user_prompt: String,
        output_variable: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost_variable: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },

    /// Parse a string variable as JSON.
    #[serde(rename = "Parse_JSON")]
    ParseJson {
        input_variable: String,
        output_variable: String,
    },

    /// Trim and normalize a string into a `.`-terminated Prolog query.
    #[serde(rename = "Extract_Prolog_Query")]
    ExtractPrologQuery {
        input_variable: String,
        output_variable: String,
    },

    /// Convert a SIR object or array into Prolog clause strings.
    #[serde(rename = "SIR_To_Prolog")]
    SirToProlog {
        input_variable: String,
        output_variable: String,
    },

    /// Convert a logical-form tree into Prolog clause strings.
    #[serde(rename = "LF_To_Prolog")]
    LfToProlog {
        input_variable: String,
        output_variable: String,
    },

    /// Jump to the first branch whose condition matches the input object.
    #[serde(rename = "Conditional_Router")]
    ConditionalRouter {
        input_variable: String,
        branches: Vec<Branch>,
    },

    /// Run the reasoner's validate over a KB or clause variable.
    #[serde(rename = "Validate_Prolog")]
    ValidateProlog {
        input_variable: String,
        output_variable: String,
    },
}

impl NodeKind {
    /// Wire name of the node type, used in error context.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::LlmCall { .. } => "LLM_Call",
            Self::ParseJson { .. } => "Parse_JSON",
            Self::ExtractPrologQuery { .. } => "Extract_Prolog_Query",
            Self::SirToProlog { .. } => "SIR_To_Prolog",
            Self::LfToProlog { .. } => "LF_To_Prolog",
            Self::ConditionalRouter { .. } => "Conditional_Router",
            Self::ValidateProlog { .. } => "Validate_Prolog",
        }
    }
}

/// One branch of a `Conditional_Router`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: BranchCondition,
    pub target: String,
}

/// Branch condition: property presence on the input object, or the
/// declaration-ordered default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_exists: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
}

impl BranchCondition {
    pub fn is_default(&self) -> bool {
        self.default == Some(true)
    }
}

impl Strategy {
    /// Stable content-addressable identifier: SHA-256 over the canonical
    /// JSON form, identical across machines for identical definitions.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }

    /// Check the structural invariants: unique node ids, edges and branch
    /// targets referencing known nodes, acyclicity, a result variable.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidStrategyNode(format!(
                "strategy '{}' has no nodes",
                self.id
            )));
        }
        if self.result_variable.is_empty() {
            return Err(Error::InvalidStrategyNode(format!(
                "strategy '{}' has no result variable",
                self.id
            )));
        }

        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(Error::InvalidStrategyNode(format!(
                    "duplicate node id '{}' in strategy '{}'",
                    node.id, self.id
                )));
            }
        }

        for edge in &self.edges {
            for end in [&edge.from, &edge.to] {
                if !ids.contains(end.as_str()) {
                    return Err(Error::InvalidStrategyNode(format!(
                        "edge references unknown node '{end}' in strategy '{}'",
                        self.id
                    )));
                }
            }
        }

        for node in &self.nodes {
            if let NodeKind::ConditionalRouter { branches, .. } = &node.kind {
                if branches.is_empty() {
                    return Err(Error::InvalidStrategyNode(format!(
                        "router node '{}' has no branches",
                        node.id
                    )));
                }
                for branch in branches {
                    if !ids.contains(branch.target.as_str()) {
                        return Err(Error::InvalidStrategyNode(format!(
                            "branch targets unknown node '{}' in strategy '{}'",
                            branch.target, self.id
                        )));
                    }
                    if branch.condition.property_exists.is_none()
                        && !branch.condition.is_default()
                    {
                        return Err(Error::InvalidStrategyNode(format!(
                            "branch in node '{}' has neither property_exists nor default",
                            node.id
                        )));
                    }
                }
            }
        }

        self.topo_order().map(|_| ())
    }

    /// Topological execution order (indices into `nodes`), stable with
    /// respect to declaration order among ready nodes.
    pub fn topo_order(&self) -> Result<Vec<usize>> {
        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let n = self.nodes.len();
        let mut indegree = vec![0usize; n];
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in &self.edges {
            let (Some(&from), Some(&to)) =
                (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
            else {
                return Err(Error::InvalidStrategyNode(format!(
                    "edge {} -> {} references unknown nodes",
                    edge.from, edge.to
                )));
            };
            adjacency[from].push(to);
            indegree[to] += 1;
        }

        let mut order = Vec::with_capacity(n);
        let mut emitted = vec![false; n];
        while order.len() < n {
            let Some(next) = (0..n).find(|&i| !emitted[i] && indegree[i] == 0) else {
                return Err(Error::InvalidStrategyNode(format!(
                    "strategy '{}' contains a cycle",
                    self.id
                )));
            };
            emitted[next] = true;
            order.push(next);
            for &succ in &adjacency[next] {
                indegree[succ] -= 1;
            }
        }
        Ok(order)
    }

    /// Index of a node by id.
    pub fn node_position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn passthrough(id: &str, input: &str, output: &str) -> StrategyNode {
        StrategyNode {
            id: id.to_string(),
            kind: NodeKind::ExtractPrologQuery {
                input_variable: input.to_string(),
                output_variable: output.to_string(),
            },
        }
    }

    fn linear_strategy() -> Strategy {
        Strategy {
            id: "T-1".into(),
            name: "test".into(),
            nodes: vec![passthrough("n1", "a", "b"), passthrough("n2", "b", "c")],
            edges: vec![StrategyEdge {
                from: "n1".into(),
                to: "n2".into(),
            }],
            result_variable: "c".into(),
        }
    }

    #[test]
    fn test_valid_strategy_passes() {
        linear_strategy().validate().unwrap();
    }

    #[test]
    fn test_topo_order_respects_edges() {
        let mut strategy = linear_strategy();
        // Declare in reverse; the edge still forces n1 before n2.
        strategy.nodes.reverse();
        let order = strategy.topo_order().unwrap();
        let ids: Vec<&str> = order
            .iter()
            .map(|&i| strategy.nodes[i].id.as_str())
            .collect();
        assert_eq!(ids, vec!["n1", "n2"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut strategy = linear_strategy();
        strategy.edges.push(StrategyEdge {
            from: "n2".into(),
            to: "n1".into(),
        });
        assert!(strategy.validate().is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut strategy = linear_strategy();
        strategy.nodes.push(passthrough("n1", "x", "y"));
        assert!(strategy.validate().is_err());
    }

    #[test]
    fn test_unknown_edge_target_rejected() {
        let mut strategy = linear_strategy();
        strategy.edges.push(StrategyEdge {
            from: "n1".into(),
            to: "ghost".into(),
        });
        assert!(strategy.validate().is_err());
    }

    #[test]
    fn test_branch_target_must_exist() {
        let mut strategy = linear_strategy();
        strategy.nodes.push(StrategyNode {
            id: "router".into(),
            kind: NodeKind::ConditionalRouter {
                input_variable: "b".into(),
                branches: vec![Branch {
                    condition: BranchCondition {
                        property_exists: None,
                        default: Some(true),
                    },
                    target: "nowhere".into(),
                }],
            },
        });
        assert!(strategy.validate().is_err());
    }

    #[test]
    fn test_content_hash_is_stable_and_sensitive() {
        let a = linear_strategy();
        let b = linear_strategy();
        assert_eq!(a.content_hash(), b.content_hash());

        let mut c = linear_strategy();
        c.result_variable = "other".into();
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn test_node_kind_round_trips_wire_names() {
        let json = r#"{
            "id": "n1",
            "type": "LLM_Call",
            "system_prompt": "s",
            "user_prompt": "u",
            "output_variable": "out"
        }"#;
        let node: StrategyNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind.type_name(), "LLM_Call");
        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["type"], "LLM_Call");
    }
}
