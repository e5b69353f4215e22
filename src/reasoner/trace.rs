//! Best-effort rendering of native proof trees.
//!
//! The engine emits a nested `{goal, children}` JSON structure. Rendering
//! is total: malformed goals and unexpected shapes degrade to documented
//! placeholder nodes, never to an error.

use serde_json::Value;

use crate::reasoner::ProofNode;

/// Goal placeholder when a node has no goal at all.
pub const GOAL_MISSING: &str = "fail";
/// Goal placeholder when the goal exists but cannot be formatted.
pub const GOAL_UNFORMATTABLE: &str = "error_formatting_term";
/// Whole-node placeholder for shapes that are not proof nodes.
pub const GOAL_UNKNOWN: &str = "unknown_goal_type";

/// Render a native tree into a [`ProofNode`], or `None` for JSON null.
pub fn format_proof_tree(native: &Value) -> Option<ProofNode> {
    match native {
        Value::Null => None,
        other => Some(format_node(other)),
    }
}

fn format_node(value: &Value) -> ProofNode {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => return ProofNode::leaf(GOAL_UNKNOWN),
    };

    let goal = match obj.get("goal") {
        None | Some(Value::Null) => GOAL_MISSING.to_string(),
        Some(Value::String(s)) => s.clone(),
        // Numbers and booleans have an obvious textual form; anything
        // else is a term we failed to format.
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(_) => GOAL_UNFORMATTABLE.to_string(),
    };

    let children = match obj.get("children") {
        Some(Value::Array(items)) => items.iter().map(format_node).collect(),
        _ => Vec::new(),
    };

    ProofNode { goal, children }
}
