//! Strategy DAG interpreter.
//!
//! Executes nodes in topological order over a mutable variable
//! environment. A `Conditional_Router` node produces an explicit jump the
//! interpreter consumes before advancing; all other nodes fall through to
//! the next node in order. Node execution is strictly sequential — the
//! only suspension points are the LLM and reasoner adapter calls.

use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::llm::{GenerateOptions, LlmAdapter};
use crate::reasoner::Reasoner;
use crate::strategy::state::{ExecutionState, Value};
use crate::strategy::types::{NodeKind, Strategy, StrategyNode};
use crate::strategy::{lf, sir};

/// What a node tells the interpreter to do next.
enum StepOutcome {
    Advance,
    Jump(String),
}

/// Interpreter for strategy definitions.
///
/// Borrows its adapters; the executor itself is stateless and a new
/// [`ExecutionState`] is created per run, so concurrent runs never share
/// variables.
pub struct StrategyExecutor<'a> {
    llm: &'a dyn LlmAdapter,
    reasoner: &'a dyn Reasoner,
}

impl<'a> StrategyExecutor<'a> {
    pub fn new(llm: &'a dyn LlmAdapter, reasoner: &'a dyn Reasoner) -> Self {
        Self { llm, reasoner }
    }

    /// Run a strategy over the given initial context and return the value
    /// bound to its result variable.
    pub async fn execute(
        &self,
        strategy: &Strategy,
        initial: HashMap<String, Value>,
    ) -> Result<Value> {
        strategy.validate()?;
        let order = strategy.topo_order()?;
        let order_position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(pos, &node_idx)| (strategy.nodes[node_idx].id.as_str(), pos))
            .collect();

        let mut state = ExecutionState::new(initial);
        // Entry is the first node in topological order; from there,
        // execution follows edges (or an explicit jump) and halts at a
        // sink. Fallthrough into a sibling branch can't happen.
        let mut pc = 0usize;

        while pc < order.len() {
            let node = &strategy.nodes[order[pc]];
            tracing::debug!(strategy = %strategy.id, node = %node.id, "executing node");

            let outcome = self
                .run_node(node, &mut state)
                .await
                .map_err(|e| match e {
                    already @ Error::StrategyExecution { .. } => already,
                    inner => Error::strategy_execution(
                        &strategy.id,
                        &node.id,
                        node.kind.type_name(),
                        inner,
                    ),
                })?;

            match outcome {
                StepOutcome::Advance => {
                    let successor = strategy
                        .edges
                        .iter()
                        .filter(|e| e.from == node.id)
                        .filter_map(|e| order_position.get(e.to.as_str()).copied())
                        .min();
                    match successor {
                        Some(next) => pc = next,
                        None => break,
                    }
                }
                StepOutcome::Jump(target) => {
                    // Branch targets are checked at load; missing here
                    // means the definition changed under us.
                    pc = *order_position.get(target.as_str()).ok_or_else(|| {
                        Error::InvalidStrategyNode(format!(
                            "jump target '{target}' not in strategy '{}'",
                            strategy.id
                        ))
                    })?;
                }
            }
        }

        state
            .get(&strategy.result_variable)
            .cloned()
            .ok_or_else(|| {
                Error::StrategyInvalidOutput(format!(
                    "strategy '{}' never bound its result variable '{}'",
                    strategy.id, strategy.result_variable
                ))
            })
    }

    async fn run_node(&self, node: &StrategyNode, state: &mut ExecutionState) -> Result<StepOutcome> {
        match &node.kind {
            NodeKind::LlmCall {
                system_prompt,
                user_prompt,
                output_variable,
                cost_variable,
                model,
            } => {
                let system = state.render_template(&node.id, system_prompt)?;
                let user = state.render_template(&node.id, user_prompt)?;
                let mut options = GenerateOptions::new();
                options.model = model.clone();
                let response = self.llm.generate(&system, &user, &options).await?;
                let text = response.text.ok_or(Error::LlmEmptyResponse)?;
                state.set(output_variable.clone(), Value::Text(text));
                if let (Some(cost_var), Some(cost)) = (cost_variable, response.cost) {
                    state.set(cost_var.clone(), Value::Json(cost));
                }
                Ok(StepOutcome::Advance)
            }

            NodeKind::ParseJson {
                input_variable,
                output_variable,
            } => {
                let text = expect_text(&node.id, state, input_variable)?;
                let parsed = serde_json::from_str(&text).map_err(|e| Error::JsonParsing {
                    node_id: node.id.clone(),
                    detail: e.to_string(),
                })?;
                state.set(output_variable.clone(), Value::Json(parsed));
                Ok(StepOutcome::Advance)
            }

            NodeKind::ExtractPrologQuery {
                input_variable,
                output_variable,
            } => {
                let text = expect_text(&node.id, state, input_variable)?;
                let query = normalize_query(&text);
                state.set(output_variable.clone(), Value::Text(query));
                Ok(StepOutcome::Advance)
            }

            NodeKind::SirToProlog {
                input_variable,
                output_variable,
            } => {
                let value = expect_json(&node.id, state, input_variable)?;
                let clauses = sir::to_clauses(&value)?;
                state.set(output_variable.clone(), Value::Clauses(clauses));
                Ok(StepOutcome::Advance)
            }

            NodeKind::LfToProlog {
                input_variable,
                output_variable,
            } => {
                let value = expect_json(&node.id, state, input_variable)?;
                let clauses = lf::to_clauses(&value)?;
                state.set(output_variable.clone(), Value::Clauses(clauses));
                Ok(StepOutcome::Advance)
            }

            NodeKind::ConditionalRouter {
                input_variable,
                branches,
            } => {
                let input = state.get(input_variable).ok_or_else(|| {
                    Error::InvalidStrategyNode(format!(
                        "router node '{}' input variable '{input_variable}' is unbound",
                        node.id
                    ))
                })?;
                let properties = input.as_json().and_then(|v| v.as_object());

                for branch in branches {
                    if let Some(property) = &branch.condition.property_exists {
                        if properties.is_some_and(|obj| obj.contains_key(property)) {
                            return Ok(StepOutcome::Jump(branch.target.clone()));
                        }
                    } else if branch.condition.is_default() {
                        return Ok(StepOutcome::Jump(branch.target.clone()));
                    }
                }
                Ok(StepOutcome::Advance)
            }

            NodeKind::ValidateProlog {
                input_variable,
                output_variable,
            } => {
                let kb = match state.get(input_variable) {
                    Some(Value::Text(s)) => s.clone(),
                    Some(Value::Clauses(c)) => c.join("\n"),
                    Some(other) => {
                        return Err(Error::InvalidNodeInput {
                            node_id: node.id.clone(),
                            expected: "text or clauses",
                            got: other.kind().to_string(),
                        })
                    }
                    None => {
                        return Err(Error::InvalidNodeInput {
                            node_id: node.id.clone(),
                            expected: "text or clauses",
                            got: "unbound".to_string(),
                        })
                    }
                };
                let verdict = self.reasoner.validate(&kb).await?;
                let rendered = serde_json::to_value(&verdict)
                    .unwrap_or_else(|_| json!({"valid": verdict.valid}));
                state.set(output_variable.clone(), Value::Json(rendered));
                Ok(StepOutcome::Advance)
            }
        }
    }
}

fn expect_text(node_id: &str, state: &ExecutionState, variable: &str) -> Result<String> {
    match state.get(variable) {
        Some(Value::Text(s)) => Ok(s.clone()),
        Some(other) => Err(Error::InvalidNodeInput {
            node_id: node_id.to_string(),
            expected: "string",
            got: other.kind().to_string(),
        }),
        None => Err(Error::InvalidNodeInput {
            node_id: node_id.to_string(),
            expected: "string",
            got: "unbound".to_string(),
        }),
    }
}

fn expect_json(node_id: &str, state: &ExecutionState, variable: &str) -> Result<serde_json::Value> {
    match state.get(variable) {
        Some(Value::Json(v)) => Ok(v.clone()),
        Some(other) => Err(Error::InvalidNodeInput {
            node_id: node_id.to_string(),
            expected: "json",
            got: other.kind().to_string(),
        }),
        None => Err(Error::InvalidNodeInput {
            node_id: node_id.to_string(),
            expected: "json",
            got: "unbound".to_string(),
        }),
    }
}

/// Trim an LLM answer down to a `.`-terminated query: markdown fences and
/// stray backticks go, a missing terminal period is appended.
fn normalize_query(text: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:[a-zA-Z]+)?\s*(.*?)\s*```").unwrap()
    });

    let inner = fence
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    let trimmed = inner.trim().trim_matches('`').trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.ends_with('.') {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::llm::GenerateResponse;
    use crate::reasoner::{QueryOptions, QueryOutcome, Validation};
    use crate::strategy::types::{Branch, BranchCondition, StrategyEdge};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// LLM stub replaying a fixed script of responses.
    struct ScriptedLlm {
        responses: Mutex<VecDeque<Option<String>>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(
                    responses.into_iter().map(|r| Some(r.to_string())).collect(),
                ),
            }
        }

        fn empty_response() -> Self {
            Self {
                responses: Mutex::new(VecDeque::from([None])),
            }
        }
    }

    #[async_trait]
    impl LlmAdapter for ScriptedLlm {
        async fn generate(
            &self,
            _system: &str,
            _user: &str,
            _options: &GenerateOptions,
        ) -> crate::error::Result<GenerateResponse> {
            let text = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Some("out of script".to_string()));
            Ok(GenerateResponse {
                text,
                cost: Some(json!({"input_tokens": 10, "output_tokens": 5})),
            })
        }

        fn model_id(&self) -> String {
            "scripted".to_string()
        }
    }

    /// Reasoner stub that accepts every KB.
    struct AcceptAllReasoner;

    #[async_trait]
    impl Reasoner for AcceptAllReasoner {
        async fn consult_and_query(
            &self,
            _kb: &str,
            _query: &str,
            _options: &QueryOptions,
        ) -> crate::error::Result<QueryOutcome> {
            Ok(QueryOutcome {
                solutions: Vec::new(),
                trace: None,
                limit_exceeded: false,
            })
        }

        async fn validate(&self, kb: &str) -> crate::error::Result<Validation> {
            if kb.contains("bad") {
                Ok(Validation::invalid("syntax error near 'bad'"))
            } else {
                Ok(Validation::ok())
            }
        }
    }

    fn node(id: &str, kind: NodeKind) -> StrategyNode {
        StrategyNode {
            id: id.to_string(),
            kind,
        }
    }

    fn edge(from: &str, to: &str) -> StrategyEdge {
        StrategyEdge {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn sir_assert_strategy() -> Strategy {
        Strategy {
            id: "SIR-T-Assert".into(),
            name: "test assert".into(),
            nodes: vec![
                node(
                    "n1",
                    NodeKind::LlmCall {
                        system_prompt: "Translate to SIR.".into(),
                        user_prompt: "Text: {{naturalLanguageText}}".into(),
                        output_variable: "rawJson".into(),
                        cost_variable: Some("llmCost".into()),
                        model: None,
                    },
                ),
                node(
                    "n2",
                    NodeKind::ParseJson {
                        input_variable: "rawJson".into(),
                        output_variable: "sir".into(),
                    },
                ),
                node(
                    "n3",
                    NodeKind::SirToProlog {
                        input_variable: "sir".into(),
                        output_variable: "clauses".into(),
                    },
                ),
            ],
            edges: vec![edge("n1", "n2"), edge("n2", "n3")],
            result_variable: "clauses".into(),
        }
    }

    fn initial_context() -> HashMap<String, Value> {
        let mut ctx = HashMap::new();
        ctx.insert(
            "naturalLanguageText".to_string(),
            Value::Text("The sky is blue".to_string()),
        );
        ctx
    }

    #[tokio::test]
    async fn test_linear_pipeline() {
        let llm = ScriptedLlm::new(vec![
            r#"{"statementType": "fact", "fact": {"predicate": "is_blue", "arguments": ["sky"]}}"#,
        ]);
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        let result = executor
            .execute(&sir_assert_strategy(), initial_context())
            .await
            .unwrap();
        assert_eq!(result, Value::Clauses(vec!["is_blue(sky).".to_string()]));
    }

    #[tokio::test]
    async fn test_same_script_same_result() {
        let strategy = sir_assert_strategy();
        let script =
            r#"{"statementType": "fact", "fact": {"predicate": "is_blue", "arguments": ["sky"]}}"#;

        let mut results = Vec::new();
        for _ in 0..2 {
            let llm = ScriptedLlm::new(vec![script]);
            let reasoner = AcceptAllReasoner;
            let executor = StrategyExecutor::new(&llm, &reasoner);
            results.push(executor.execute(&strategy, initial_context()).await.unwrap());
        }
        assert_eq!(results[0], results[1]);
    }

    #[tokio::test]
    async fn test_parse_json_failure_names_the_node() {
        let llm = ScriptedLlm::new(vec!["this is not json"]);
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        let err = executor
            .execute(&sir_assert_strategy(), initial_context())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StrategyExecutionError);
        assert_eq!(err.surface_code(), ErrorCode::JsonParsingFailed);
        let text = err.to_string();
        assert!(text.contains("n2"), "missing node id: {text}");
    }

    #[tokio::test]
    async fn test_llm_cost_is_bound() {
        let llm = ScriptedLlm::new(vec![
            r#"{"statementType": "fact", "fact": {"predicate": "a", "arguments": []}}"#,
        ]);
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        let mut strategy = sir_assert_strategy();
        strategy.result_variable = "llmCost".into();
        let result = executor.execute(&strategy, initial_context()).await.unwrap();
        assert_eq!(
            result,
            Value::Json(json!({"input_tokens": 10, "output_tokens": 5}))
        );
    }

    #[tokio::test]
    async fn test_empty_llm_response_errors() {
        let llm = ScriptedLlm::empty_response();
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        let err = executor
            .execute(&sir_assert_strategy(), initial_context())
            .await
            .unwrap_err();
        assert_eq!(err.surface_code(), ErrorCode::LlmEmptyResponse);
    }

    #[tokio::test]
    async fn test_extract_query_normalization() {
        let strategy = Strategy {
            id: "Q".into(),
            name: "query extract".into(),
            nodes: vec![node(
                "n1",
                NodeKind::ExtractPrologQuery {
                    input_variable: "raw".into(),
                    output_variable: "query".into(),
                },
            )],
            edges: vec![],
            result_variable: "query".into(),
        };
        let llm = ScriptedLlm::new(vec![]);
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        for (raw, expected) in [
            ("is_blue(sky).", "is_blue(sky)."),
            ("  is_blue(sky)  ", "is_blue(sky)."),
            ("```prolog\nis_blue(sky).\n```", "is_blue(sky)."),
            ("`is_blue(sky)`", "is_blue(sky)."),
        ] {
            let mut ctx = HashMap::new();
            ctx.insert("raw".to_string(), Value::Text(raw.to_string()));
            let result = executor.execute(&strategy, ctx).await.unwrap();
            assert_eq!(result, Value::Text(expected.to_string()), "raw: {raw:?}");
        }
    }

    #[tokio::test]
    async fn test_extract_query_rejects_non_string() {
        let strategy = Strategy {
            id: "Q".into(),
            name: "query extract".into(),
            nodes: vec![node(
                "n1",
                NodeKind::ExtractPrologQuery {
                    input_variable: "raw".into(),
                    output_variable: "query".into(),
                },
            )],
            edges: vec![],
            result_variable: "query".into(),
        };
        let llm = ScriptedLlm::new(vec![]);
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        let mut ctx = HashMap::new();
        ctx.insert("raw".to_string(), Value::Json(json!({"a": 1})));
        let err = executor.execute(&strategy, ctx).await.unwrap_err();
        assert_eq!(err.surface_code(), ErrorCode::InvalidNodeInput);
    }

    fn router_strategy() -> Strategy {
        // Router picks between an LF path and a SIR path based on which
        // property the parsed payload carries.
        Strategy {
            id: "R".into(),
            name: "routed".into(),
            nodes: vec![
                node(
                    "route",
                    NodeKind::ConditionalRouter {
                        input_variable: "payload".into(),
                        branches: vec![
                            Branch {
                                condition: BranchCondition {
                                    property_exists: Some("lf".into()),
                                    default: None,
                                },
                                target: "lf_path".into(),
                            },
                            Branch {
                                condition: BranchCondition {
                                    property_exists: None,
                                    default: Some(true),
                                },
                                target: "default_path".into(),
                            },
                        ],
                    },
                ),
                node(
                    "lf_path",
                    NodeKind::ExtractPrologQuery {
                        input_variable: "lfText".into(),
                        output_variable: "result".into(),
                    },
                ),
                node(
                    "default_path",
                    NodeKind::ExtractPrologQuery {
                        input_variable: "defaultText".into(),
                        output_variable: "result".into(),
                    },
                ),
            ],
            edges: vec![edge("route", "lf_path"), edge("route", "default_path")],
            result_variable: "result".into(),
        }
    }

    #[tokio::test]
    async fn test_router_picks_matching_property() {
        let llm = ScriptedLlm::new(vec![]);
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        let mut ctx = HashMap::new();
        ctx.insert("payload".to_string(), Value::Json(json!({"lf": {}})));
        ctx.insert("lfText".to_string(), Value::Text("from_lf".into()));
        ctx.insert("defaultText".to_string(), Value::Text("from_default".into()));

        let result = executor.execute(&router_strategy(), ctx).await.unwrap();
        assert_eq!(result, Value::Text("from_lf.".to_string()));
    }

    #[tokio::test]
    async fn test_router_falls_back_to_default() {
        let llm = ScriptedLlm::new(vec![]);
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        let mut ctx = HashMap::new();
        ctx.insert("payload".to_string(), Value::Json(json!({"sir": {}})));
        ctx.insert("lfText".to_string(), Value::Text("from_lf".into()));
        ctx.insert("defaultText".to_string(), Value::Text("from_default".into()));

        let result = executor.execute(&router_strategy(), ctx).await.unwrap();
        assert_eq!(result, Value::Text("from_default.".to_string()));
    }

    #[tokio::test]
    async fn test_router_unbound_input_is_invalid_strategy_node() {
        let llm = ScriptedLlm::new(vec![]);
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        let err = executor
            .execute(&router_strategy(), HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.surface_code(), ErrorCode::InvalidStrategyNode);
    }

    #[tokio::test]
    async fn test_validate_prolog_node_binds_verdict() {
        let strategy = Strategy {
            id: "V".into(),
            name: "validate".into(),
            nodes: vec![node(
                "n1",
                NodeKind::ValidateProlog {
                    input_variable: "kb".into(),
                    output_variable: "verdict".into(),
                },
            )],
            edges: vec![],
            result_variable: "verdict".into(),
        };
        let llm = ScriptedLlm::new(vec![]);
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        let mut ctx = HashMap::new();
        ctx.insert("kb".to_string(), Value::Clauses(vec!["good(x).".into()]));
        let result = executor.execute(&strategy, ctx).await.unwrap();
        assert_eq!(result, Value::Json(json!({"valid": true})));

        let mut ctx = HashMap::new();
        ctx.insert("kb".to_string(), Value::Text("bad(".into()));
        let result = executor.execute(&strategy, ctx).await.unwrap();
        let json = result.as_json().unwrap().clone();
        assert_eq!(json["valid"], false);
        assert!(json["error"].as_str().unwrap().contains("bad"));
    }

    #[tokio::test]
    async fn test_unbound_result_variable_is_invalid_output() {
        let strategy = Strategy {
            id: "X".into(),
            name: "no result".into(),
            nodes: vec![node(
                "n1",
                NodeKind::ExtractPrologQuery {
                    input_variable: "raw".into(),
                    output_variable: "other".into(),
                },
            )],
            edges: vec![],
            result_variable: "never_bound".into(),
        };
        let llm = ScriptedLlm::new(vec![]);
        let reasoner = AcceptAllReasoner;
        let executor = StrategyExecutor::new(&llm, &reasoner);

        let mut ctx = HashMap::new();
        ctx.insert("raw".to_string(), Value::Text("a.".into()));
        let err = executor.execute(&strategy, ctx).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StrategyInvalidOutput);
    }
}
