//! # mcr-core
//!
//! A neuro-symbolic reasoning core bridging a large language model and a
//! Prolog engine. Natural-language assertions and questions run against
//! named sessions: translation strategies (swappable dataflow graphs)
//! turn language into clauses and queries, the reasoner executes them
//! over the session knowledge base plus global ontologies, and answers
//! come back in natural language with optional proof traces.
//!
//! ## Core Components
//!
//! - **Strategy**: registry + executor for translation strategy DAGs
//! - **Session**: knowledge-base sessions with a predicate lexicon,
//!   in-memory or file-backed
//! - **Reasoner**: consult / query / validate / proof-trace over an
//!   engine subprocess
//! - **Router**: strategy recommendation from empirical performance
//! - **Service**: the orchestrator tying the flows together
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcr_core::{
//!     AnthropicAdapter, AnthropicConfig, AssertOptions, McrService,
//!     MemorySessionStore, QueryNlOptions, StaticOntology, SwiplReasoner,
//! };
//!
//! let service = McrService::new(
//!     Arc::new(AnthropicAdapter::new(AnthropicConfig::new(api_key))?),
//!     Arc::new(SwiplReasoner::discover()?),
//!     Arc::new(MemorySessionStore::new()),
//!     Arc::new(StaticOntology::empty()),
//! );
//!
//! let session = service.create_session(None).await?;
//! service.assert_nl(&session.id, "The sky is blue", &AssertOptions::default()).await;
//! let answer = service.query_nl(&session.id, "Is the sky blue?", &QueryNlOptions::default()).await;
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod llm;
pub mod ontology;
pub mod prompts;
pub mod reasoner;
pub mod router;
pub mod service;
pub mod session;
pub mod strategy;

// Re-exports for convenience
pub use cancel::{CancelSignal, CancelToken};
pub use config::{DebugLevel, McrConfig};
pub use error::{Error, ErrorCode, Result};
pub use llm::{AnthropicAdapter, AnthropicConfig, GenerateOptions, GenerateResponse, LlmAdapter};
pub use ontology::{OntologyEntry, OntologySource, StaticOntology};
pub use prompts::{PromptRegistry, PromptTemplate, RenderedPrompt};
pub use reasoner::{
    ProofNode, QueryOptions, QueryOutcome, Reasoner, Solution, SwiplConfig, SwiplReasoner,
    Validation,
};
pub use router::{InputClass, InputRouter, PerformanceRecord, PerformanceStore};
pub use service::{
    AssertOptions, AssertResponse, DebugInfo, ExplainResponse, McrService, PromptPreview,
    QueryNlOptions, QueryResponse, TranslateRulesResponse, TranslateTextResponse,
};
pub use session::{
    FileSessionStore, KnowledgeGraph, MemorySessionStore, Session, SessionStore, SessionSummary,
};
pub use strategy::{
    Branch, BranchCondition, ExecutionState, NodeKind, Strategy, StrategyEdge, StrategyExecutor,
    StrategyNode, StrategyRegistry, Value,
};
