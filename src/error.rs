//! Error types for mcr-core.
//!
//! Two layers: [`Error`] is the internal error enum carrying context for
//! diagnostics, and [`ErrorCode`] is the closed, wire-stable taxonomy that
//! public response envelopes expose. Every `Error` maps onto exactly one
//! code via [`Error::code`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using mcr-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-stable error codes surfaced in response envelopes.
///
/// The set is closed; codes are stable across releases. Two of them
/// (`NO_FACTS_EXTRACTED`, `NO_RULES_EXTRACTED`) ride in *successful*
/// envelopes to flag an empty-but-valid outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SessionNotFound,
    SessionAddFactsFailed,
    InvalidGeneratedProlog,
    NoFactsExtracted,
    NoRulesExtracted,
    StrategyNotFound,
    StrategyInvalidOutput,
    StrategyExecutionError,
    InvalidStrategyNode,
    InvalidNodeInput,
    JsonParsingFailed,
    InvalidLfStructure,
    PrologKbSyntax,
    PrologQuerySyntax,
    PrologAnswerProcessing,
    LlmEmptyResponse,
    EmptyExplanationGenerated,
    EmptyRulesInput,
    PromptTemplateNotFound,
    PromptFormattingFailed,
    InternalKbNotFound,
    Cancelled,
    InternalError,
}

impl ErrorCode {
    /// The wire form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionAddFactsFailed => "SESSION_ADD_FACTS_FAILED",
            Self::InvalidGeneratedProlog => "INVALID_GENERATED_PROLOG",
            Self::NoFactsExtracted => "NO_FACTS_EXTRACTED",
            Self::NoRulesExtracted => "NO_RULES_EXTRACTED",
            Self::StrategyNotFound => "STRATEGY_NOT_FOUND",
            Self::StrategyInvalidOutput => "STRATEGY_INVALID_OUTPUT",
            Self::StrategyExecutionError => "STRATEGY_EXECUTION_ERROR",
            Self::InvalidStrategyNode => "INVALID_STRATEGY_NODE",
            Self::InvalidNodeInput => "INVALID_NODE_INPUT",
            Self::JsonParsingFailed => "JSON_PARSING_FAILED",
            Self::InvalidLfStructure => "INVALID_LF_STRUCTURE",
            Self::PrologKbSyntax => "PROLOG_KB_SYNTAX",
            Self::PrologQuerySyntax => "PROLOG_QUERY_SYNTAX",
            Self::PrologAnswerProcessing => "PROLOG_ANSWER_PROCESSING",
            Self::LlmEmptyResponse => "LLM_EMPTY_RESPONSE",
            Self::EmptyExplanationGenerated => "EMPTY_EXPLANATION_GENERATED",
            Self::EmptyRulesInput => "EMPTY_RULES_INPUT",
            Self::PromptTemplateNotFound => "PROMPT_TEMPLATE_NOT_FOUND",
            Self::PromptFormattingFailed => "PROMPT_FORMATTING_FAILED",
            Self::InternalKbNotFound => "INTERNAL_KB_NOT_FOUND",
            Self::Cancelled => "CANCELLED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during MCR operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No session with the given id.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The session store rejected a fact append.
    #[error("failed to add facts to session: {0}")]
    AddFactsFailed(String),

    /// A generated clause did not pass reasoner validation.
    #[error("generated Prolog failed validation: {clause}: {detail}")]
    InvalidGeneratedProlog { clause: String, detail: String },

    /// No strategy registered under the requested id or hash.
    #[error("strategy not found: {0}")]
    StrategyNotFound(String),

    /// A strategy ran to completion but produced the wrong result shape.
    #[error("strategy produced invalid output: {0}")]
    StrategyInvalidOutput(String),

    /// A node failed; carries the node context and the original error.
    #[error("strategy '{strategy_id}' failed at node '{node_id}' ({node_type}): {message}")]
    StrategyExecution {
        strategy_id: String,
        node_id: String,
        node_type: String,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// A strategy definition is malformed (bad node refs, cycles, ...).
    #[error("invalid strategy node: {0}")]
    InvalidStrategyNode(String),

    /// A node received a value of the wrong variant.
    #[error("node '{node_id}' expected {expected} input, got {got}")]
    InvalidNodeInput {
        node_id: String,
        expected: &'static str,
        got: String,
    },

    /// `Parse_JSON` could not parse its input.
    #[error("JSON parsing failed at node '{node_id}': {detail}")]
    JsonParsing { node_id: String, detail: String },

    /// A logical-form tree had an unconvertible shape.
    #[error("invalid logical form: {0}")]
    InvalidLfStructure(String),

    /// The engine rejected the knowledge base during consult.
    #[error("knowledge base syntax error: {0}")]
    KbSyntax(String),

    /// The engine rejected the query during parse.
    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    /// A per-answer error while enumerating solutions.
    #[error("answer processing error: {0}")]
    AnswerProcessing(String),

    /// The LLM returned no text where text was required.
    #[error("LLM returned an empty response")]
    LlmEmptyResponse,

    /// An explanation pass produced no output.
    #[error("explanation generation produced no output")]
    EmptyExplanation,

    /// Rules-to-NL translation was handed an empty rule set.
    #[error("no rules supplied for translation")]
    EmptyRulesInput,

    /// No prompt template registered under the given name.
    #[error("prompt template not found: {0}")]
    PromptTemplateNotFound(String),

    /// A `{{placeholder}}` in a template had no value.
    #[error("prompt '{template}' is missing a value for placeholder '{placeholder}'")]
    PromptFormatting { template: String, placeholder: String },

    /// The assembled knowledge base went missing mid-pipeline.
    #[error("internal knowledge base not found: {0}")]
    InternalKbNotFound(String),

    /// The request was cancelled before completion.
    #[error("operation cancelled")]
    Cancelled,

    /// LLM API error.
    #[error("LLM API error: {provider} - {message}")]
    LlmApi { provider: String, message: String },

    /// Subprocess communication error (reasoner engine).
    #[error("subprocess communication error: {0}")]
    SubprocessComm(String),

    /// Timeout during operation.
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Session persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a strategy execution error wrapping an inner error.
    pub fn strategy_execution(
        strategy_id: impl Into<String>,
        node_id: impl Into<String>,
        node_type: impl Into<String>,
        inner: Error,
    ) -> Self {
        Self::StrategyExecution {
            strategy_id: strategy_id.into(),
            node_id: node_id.into(),
            node_type: node_type.into(),
            message: inner.to_string(),
            source: Some(Box::new(inner)),
        }
    }

    /// Create an LLM API error.
    pub fn llm_api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmApi {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SessionNotFound(_) => ErrorCode::SessionNotFound,
            Self::AddFactsFailed(_) => ErrorCode::SessionAddFactsFailed,
            Self::InvalidGeneratedProlog { .. } => ErrorCode::InvalidGeneratedProlog,
            Self::StrategyNotFound(_) => ErrorCode::StrategyNotFound,
            Self::StrategyInvalidOutput(_) => ErrorCode::StrategyInvalidOutput,
            Self::StrategyExecution { .. } => ErrorCode::StrategyExecutionError,
            Self::InvalidStrategyNode(_) => ErrorCode::InvalidStrategyNode,
            Self::InvalidNodeInput { .. } => ErrorCode::InvalidNodeInput,
            Self::JsonParsing { .. } => ErrorCode::JsonParsingFailed,
            Self::InvalidLfStructure(_) => ErrorCode::InvalidLfStructure,
            Self::KbSyntax(_) => ErrorCode::PrologKbSyntax,
            Self::QuerySyntax(_) => ErrorCode::PrologQuerySyntax,
            Self::AnswerProcessing(_) => ErrorCode::PrologAnswerProcessing,
            Self::LlmEmptyResponse => ErrorCode::LlmEmptyResponse,
            Self::EmptyExplanation => ErrorCode::EmptyExplanationGenerated,
            Self::EmptyRulesInput => ErrorCode::EmptyRulesInput,
            Self::PromptTemplateNotFound(_) => ErrorCode::PromptTemplateNotFound,
            Self::PromptFormatting { .. } => ErrorCode::PromptFormattingFailed,
            Self::InternalKbNotFound(_) => ErrorCode::InternalKbNotFound,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::LlmApi { .. }
            | Self::SubprocessComm(_)
            | Self::Timeout { .. }
            | Self::Storage(_)
            | Self::Config(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// The code most useful to surface to a caller.
    ///
    /// For a wrapped node failure this drills into the innermost cause, so
    /// an `INVALID_NODE_INPUT` raised inside a strategy is reported as such
    /// rather than as the generic `STRATEGY_EXECUTION_ERROR`.
    pub fn surface_code(&self) -> ErrorCode {
        match self {
            Self::StrategyExecution {
                source: Some(inner),
                ..
            } => {
                let inner_code = inner.surface_code();
                if inner_code == ErrorCode::InternalError {
                    ErrorCode::StrategyExecutionError
                } else {
                    inner_code
                }
            }
            other => other.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_are_stable() {
        assert_eq!(ErrorCode::SessionNotFound.as_str(), "SESSION_NOT_FOUND");
        assert_eq!(ErrorCode::PrologKbSyntax.as_str(), "PROLOG_KB_SYNTAX");
        assert_eq!(ErrorCode::LlmEmptyResponse.as_str(), "LLM_EMPTY_RESPONSE");
        assert_eq!(
            ErrorCode::InvalidLfStructure.as_str(),
            "INVALID_LF_STRUCTURE"
        );
    }

    #[test]
    fn test_serde_matches_as_str() {
        let codes = [
            ErrorCode::SessionNotFound,
            ErrorCode::SessionAddFactsFailed,
            ErrorCode::InvalidGeneratedProlog,
            ErrorCode::NoFactsExtracted,
            ErrorCode::NoRulesExtracted,
            ErrorCode::StrategyNotFound,
            ErrorCode::StrategyInvalidOutput,
            ErrorCode::StrategyExecutionError,
            ErrorCode::InvalidStrategyNode,
            ErrorCode::InvalidNodeInput,
            ErrorCode::JsonParsingFailed,
            ErrorCode::InvalidLfStructure,
            ErrorCode::PrologKbSyntax,
            ErrorCode::PrologQuerySyntax,
            ErrorCode::PrologAnswerProcessing,
            ErrorCode::LlmEmptyResponse,
            ErrorCode::EmptyExplanationGenerated,
            ErrorCode::EmptyRulesInput,
            ErrorCode::PromptTemplateNotFound,
            ErrorCode::PromptFormattingFailed,
            ErrorCode::InternalKbNotFound,
            ErrorCode::Cancelled,
            ErrorCode::InternalError,
        ];
        for code in codes {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_surface_code_drills_into_wrapped_errors() {
        let inner = Error::InvalidNodeInput {
            node_id: "n2".into(),
            expected: "string",
            got: "json".into(),
        };
        let wrapped = Error::strategy_execution("SIR-R1-Assert", "n2", "Extract_Prolog_Query", inner);
        assert_eq!(wrapped.code(), ErrorCode::StrategyExecutionError);
        assert_eq!(wrapped.surface_code(), ErrorCode::InvalidNodeInput);
    }

    #[test]
    fn test_surface_code_keeps_wrapper_for_opaque_causes() {
        let inner = Error::llm_api("anthropic", "connection refused");
        let wrapped = Error::strategy_execution("SIR-R1-Query", "n1", "LLM_Call", inner);
        assert_eq!(wrapped.surface_code(), ErrorCode::StrategyExecutionError);
    }
}
