//! Response envelopes and per-request options.
//!
//! Every public result carries `{success, message?, error?, details?}`
//! plus its domain fields; `error` is a stable machine code, `message` a
//! plain-English summary. Stack traces never reach the caller.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::cancel::CancelSignal;
use crate::error::{Error, ErrorCode};
use crate::prompts::PromptTemplate;
use crate::reasoner::ProofNode;

/// Options for `assert_nl`.
#[derive(Debug, Clone, Default)]
pub struct AssertOptions {
    /// Route invalid clauses through the refinement strategy before
    /// giving up.
    pub use_loops: bool,
    /// Cancellation signal for this request.
    pub cancel: Option<CancelSignal>,
}

/// Options for `query_nl`.
#[derive(Debug, Clone)]
pub struct QueryNlOptions {
    /// Per-query rule blob appended after global ontologies.
    pub dynamic_ontology: Option<String>,
    /// Answer style hint passed to the answer prompt.
    pub style: String,
    /// Capture a proof trace and generate an explanation.
    pub trace: bool,
    /// Route an invalid generated query through refinement.
    pub use_loops: bool,
    /// Cancellation signal for this request.
    pub cancel: Option<CancelSignal>,
}

impl Default for QueryNlOptions {
    fn default() -> Self {
        Self {
            dynamic_ontology: None,
            style: "conversational".to_string(),
            trace: false,
            use_loops: false,
            cancel: None,
        }
    }
}

/// Opt-in diagnostic payload.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prolog_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prolog_results: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_trace: Option<ProofNode>,
    /// Full assembled KB; verbose level only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kb_snapshot: Option<String>,
    /// Non-fatal ontology fetch failure, when one happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ontology_error: Option<String>,
    /// Opaque adapter cost objects accumulated during the request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub costs: Vec<JsonValue>,
}

impl DebugInfo {
    pub fn is_empty(&self) -> bool {
        self.strategy_id.is_none()
            && self.strategy_hash.is_none()
            && self.prolog_query.is_none()
            && self.prolog_results.is_none()
            && self.proof_trace.is_none()
            && self.kb_snapshot.is_none()
            && self.ontology_error.is_none()
            && self.costs.is_empty()
    }
}

/// Result of `assert_nl` and `translate_nl_to_rules`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub added_facts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
    /// Refinement retries spent (0 when the first pass validated).
    pub refinement_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
}

impl AssertResponse {
    pub fn failure(err: &Error) -> Self {
        let (message, details) = split_diagnostics(err);
        Self {
            success: false,
            message: Some(message),
            error: Some(err.surface_code()),
            details,
            added_facts: Vec::new(),
            strategy_id: None,
            refinement_attempts: 0,
            debug_info: None,
        }
    }
}

/// Result of `query_nl`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
}

impl QueryResponse {
    pub fn failure(err: &Error) -> Self {
        let (message, details) = split_diagnostics(err);
        Self {
            success: false,
            answer: None,
            explanation: None,
            message: Some(message),
            error: Some(err.surface_code()),
            details,
            strategy_id: None,
            debug_info: None,
        }
    }
}

/// Result of `explain_query`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
}

impl ExplainResponse {
    pub fn failure(err: &Error) -> Self {
        let (message, details) = split_diagnostics(err);
        Self {
            success: false,
            explanation: None,
            message: Some(message),
            error: Some(err.surface_code()),
            details,
            debug_info: None,
        }
    }
}

/// Result of `translate_nl_to_rules`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRulesResponse {
    pub success: bool,
    pub rules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
}

impl TranslateRulesResponse {
    pub fn failure(err: &Error) -> Self {
        let (message, details) = split_diagnostics(err);
        Self {
            success: false,
            rules: Vec::new(),
            message: Some(message),
            error: Some(err.surface_code()),
            details,
            strategy_id: None,
        }
    }
}

/// Result of `translate_rules_to_nl`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateTextResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TranslateTextResponse {
    pub fn failure(err: &Error) -> Self {
        let (message, details) = split_diagnostics(err);
        Self {
            success: false,
            text: None,
            message: Some(message),
            error: Some(err.surface_code()),
            details,
        }
    }
}

/// Rendered view of a prompt template for debug introspection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPreview {
    pub name: String,
    /// The unrendered template.
    pub template: PromptTemplate,
    pub system: String,
    pub user: String,
}

/// Split an error into a user-facing message and a one-line diagnostic.
fn split_diagnostics(err: &Error) -> (String, Option<String>) {
    match err {
        Error::InvalidGeneratedProlog { clause, detail } => (
            "The generated Prolog failed validation.".to_string(),
            Some(format!("{clause}: {detail}")),
        ),
        Error::StrategyExecution {
            strategy_id,
            node_id,
            message,
            ..
        } => (
            format!("Strategy '{strategy_id}' failed."),
            Some(format!("node '{node_id}': {message}")),
        ),
        other => (other.to_string(), None),
    }
}
