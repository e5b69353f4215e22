//! MCR service: the public orchestrator.
//!
//! Ties the pieces together: session CRUD, the assert / query / explain /
//! translate flows, validation-guided refinement, and debug
//! introspection. Flow methods return response envelopes rather than
//! `Result` — internal errors are folded into `{success: false, error,
//! message}` so callers never see a raw error chain.

mod types;

pub use types::{
    AssertOptions, AssertResponse, DebugInfo, ExplainResponse, PromptPreview, QueryNlOptions,
    QueryResponse, TranslateRulesResponse, TranslateTextResponse,
};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cancel::{run_cancellable, CancelSignal};
use crate::config::{DebugLevel, McrConfig};
use crate::error::{Error, ErrorCode, Result};
use crate::llm::{GenerateOptions, LlmAdapter};
use crate::ontology::OntologySource;
use crate::prompts::{self, PromptRegistry};
use crate::reasoner::{QueryOptions, Reasoner};
use crate::router::InputRouter;
use crate::session::{Session, SessionStore, SessionSummary};
use crate::strategy::{Strategy, StrategyExecutor, StrategyRegistry, Value};

/// Which flavor of strategy an operation wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Assert,
    Query,
}

impl Operation {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Assert => "Assert",
            Self::Query => "Query",
        }
    }

    fn system_default<'c>(&self, config: &'c McrConfig) -> &'c str {
        match self {
            Self::Assert => &config.default_assert_strategy_id,
            Self::Query => &config.default_query_strategy_id,
        }
    }
}

/// Top-level reasoning service.
///
/// One instance serves many concurrent sessions; the session store is the
/// only shared mutable state, and the active base strategy sits behind its
/// own lock.
pub struct McrService {
    llm: Arc<dyn LlmAdapter>,
    reasoner: Arc<dyn Reasoner>,
    sessions: Arc<dyn SessionStore>,
    ontology: Arc<dyn OntologySource>,
    strategies: Arc<StrategyRegistry>,
    router: Option<InputRouter>,
    prompts: PromptRegistry,
    config: McrConfig,
    active_base_strategy: RwLock<String>,
}

impl McrService {
    /// Service with the built-in strategies, default prompts, default
    /// config, and no router.
    pub fn new(
        llm: Arc<dyn LlmAdapter>,
        reasoner: Arc<dyn Reasoner>,
        sessions: Arc<dyn SessionStore>,
        ontology: Arc<dyn OntologySource>,
    ) -> Self {
        let config = McrConfig::default();
        let active = config.base_strategy_id.clone();
        Self {
            llm,
            reasoner,
            sessions,
            ontology,
            strategies: Arc::new(StrategyRegistry::with_builtins()),
            router: None,
            prompts: PromptRegistry::with_defaults(),
            config,
            active_base_strategy: RwLock::new(active),
        }
    }

    pub fn with_config(mut self, config: McrConfig) -> Self {
        self.active_base_strategy = RwLock::new(config.base_strategy_id.clone());
        self.config = config;
        self
    }

    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = Arc::new(strategies);
        self
    }

    pub fn with_router(mut self, router: InputRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn with_prompts(mut self, prompts: PromptRegistry) -> Self {
        self.prompts = prompts;
        self
    }

    // ==================== Session CRUD ====================

    pub async fn create_session(&self, id: Option<String>) -> Result<Session> {
        self.sessions.create_session(id).await
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        self.sessions.get_session(id).await
    }

    pub async fn delete_session(&self, id: &str) -> Result<bool> {
        self.sessions.delete_session(id).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.sessions.list_sessions().await
    }

    // ==================== Strategy management ====================

    /// The active base strategy id.
    pub async fn translation_strategy(&self) -> String {
        self.active_base_strategy.read().await.clone()
    }

    /// Switch the active base strategy. The id must resolve to at least
    /// one registered strategy (bare, `-Assert`, or `-Query`).
    pub async fn set_translation_strategy(&self, base_id: &str) -> Result<()> {
        let known = self.strategies.get(base_id).is_some()
            || self.strategies.get(&format!("{base_id}-Assert")).is_some()
            || self.strategies.get(&format!("{base_id}-Query")).is_some();
        if !known {
            return Err(Error::StrategyNotFound(base_id.to_string()));
        }
        *self.active_base_strategy.write().await = base_id.to_string();
        Ok(())
    }

    /// Pick a strategy: router recommendation by hash first, then
    /// `{base}-{op}`, then `{base}`, then the configured default.
    async fn select_strategy(&self, op: Operation, nl_text: &str) -> Result<Arc<Strategy>> {
        if let Some(router) = &self.router {
            match router.recommend(nl_text, &self.llm.model_id()) {
                Ok(Some(hash)) => {
                    if let Some(strategy) = self.strategies.get_by_hash(&hash) {
                        return Ok(strategy);
                    }
                    tracing::warn!(hash = %hash, "router recommended an unregistered strategy");
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "router lookup failed, falling back"),
            }
        }

        let base = self.active_base_strategy.read().await.clone();
        let candidates = [
            format!("{base}-{}", op.suffix()),
            base,
            op.system_default(&self.config).to_string(),
        ];
        for id in &candidates {
            if let Some(strategy) = self.strategies.get(id) {
                return Ok(strategy);
            }
        }
        Err(Error::StrategyNotFound(candidates.join(", ")))
    }

    // ==================== Primary flows ====================

    /// Translate a natural-language statement into clauses and assert
    /// them into the session.
    pub async fn assert_nl(
        &self,
        session_id: &str,
        nl_text: &str,
        options: &AssertOptions,
    ) -> AssertResponse {
        match self.assert_inner(session_id, nl_text, options).await {
            Ok(response) => response,
            Err(e) => AssertResponse::failure(&e),
        }
    }

    async fn assert_inner(
        &self,
        session_id: &str,
        nl_text: &str,
        options: &AssertOptions,
    ) -> Result<AssertResponse> {
        let session = self.require_session(session_id).await?;
        let strategy = self.select_strategy(Operation::Assert, nl_text).await?;

        let mut debug = DebugInfo::default();
        if self.config.debug_level.at_least(DebugLevel::Basic) {
            debug.strategy_id = Some(strategy.id.clone());
            debug.strategy_hash = Some(strategy.content_hash());
        }

        let ontology_rules = self.fetch_ontology(&mut debug).await;
        let lexicon_summary = session.lexicon_summary();

        let mut context = self.base_context(&session, &ontology_rules);
        context.insert(
            "naturalLanguageText".to_string(),
            Value::Text(nl_text.to_string()),
        );

        let cancel = options.cancel.as_ref();
        let result = self.run_strategy(&strategy, context, cancel).await?;
        let clauses = clauses_from_value(result)?;

        if clauses.is_empty() {
            return Ok(AssertResponse {
                success: true,
                message: Some("No facts could be extracted from the input.".to_string()),
                error: Some(ErrorCode::NoFactsExtracted),
                details: None,
                added_facts: Vec::new(),
                strategy_id: Some(strategy.id.clone()),
                refinement_attempts: 0,
                debug_info: self.debug_slot(debug),
            });
        }

        // Validation gate: nothing reaches the session until every clause
        // passes, refining through the loop bound when enabled.
        let mut refinement_attempts = 0u32;
        let mut validated = Vec::with_capacity(clauses.len());
        for clause in clauses {
            let mut current = clause;
            let mut attempt = 0u32;
            loop {
                let verdict =
                    run_cancellable(cancel, self.reasoner.validate(&current)).await?;
                if verdict.valid {
                    validated.push(current);
                    break;
                }
                let detail = verdict
                    .error
                    .unwrap_or_else(|| "clause rejected by the reasoner".to_string());
                if !options.use_loops || attempt >= self.config.max_refinement_iterations {
                    return Err(Error::InvalidGeneratedProlog {
                        clause: current,
                        detail,
                    });
                }
                attempt += 1;
                refinement_attempts += 1;
                tracing::debug!(attempt, clause = %current, "refining invalid clause");
                current = self
                    .refine_clause(&current, &detail, &lexicon_summary, cancel)
                    .await?;
            }
        }

        if cancel.is_some_and(CancelSignal::is_cancelled) {
            return Err(Error::Cancelled);
        }
        let added = self.sessions.add_facts(session_id, &validated).await?;

        if self.config.debug_level.at_least(DebugLevel::Verbose) {
            debug.kb_snapshot = self
                .sessions
                .get_knowledge_base(session_id)
                .await?
                .or(Some(String::new()));
        }

        Ok(AssertResponse {
            success: true,
            message: None,
            error: None,
            details: None,
            added_facts: added,
            strategy_id: Some(strategy.id.clone()),
            refinement_attempts,
            debug_info: self.debug_slot(debug),
        })
    }

    /// Answer a natural-language question against the session KB plus
    /// global (and optionally dynamic) ontologies.
    pub async fn query_nl(
        &self,
        session_id: &str,
        nl_question: &str,
        options: &QueryNlOptions,
    ) -> QueryResponse {
        match self.query_inner(session_id, nl_question, options).await {
            Ok(response) => response,
            Err(e) => QueryResponse::failure(&e),
        }
    }

    async fn query_inner(
        &self,
        session_id: &str,
        nl_question: &str,
        options: &QueryNlOptions,
    ) -> Result<QueryResponse> {
        let session = self.require_session(session_id).await?;
        let strategy = self.select_strategy(Operation::Query, nl_question).await?;

        let mut debug = DebugInfo::default();
        if self.config.debug_level.at_least(DebugLevel::Basic) {
            debug.strategy_id = Some(strategy.id.clone());
            debug.strategy_hash = Some(strategy.content_hash());
        }

        let ontology_rules = self.fetch_ontology(&mut debug).await;
        let cancel = options.cancel.as_ref();

        let mut context = self.base_context(&session, &ontology_rules);
        context.insert(
            "naturalLanguageQuestion".to_string(),
            Value::Text(nl_question.to_string()),
        );

        let result = self.run_strategy(&strategy, context, cancel).await?;
        let mut query = query_from_value(result)?;

        // Same validation-guided loop as the assert path, applied to the
        // generated query before it reaches the engine.
        if options.use_loops {
            let lexicon_summary = session.lexicon_summary();
            let mut attempt = 0u32;
            loop {
                let verdict = run_cancellable(cancel, self.reasoner.validate(&query)).await?;
                if verdict.valid {
                    break;
                }
                let detail = verdict
                    .error
                    .unwrap_or_else(|| "query rejected by the reasoner".to_string());
                if attempt >= self.config.max_refinement_iterations {
                    return Err(Error::InvalidGeneratedProlog {
                        clause: query,
                        detail,
                    });
                }
                attempt += 1;
                tracing::debug!(attempt, query = %query, "refining invalid query");
                query = self
                    .refine_clause(&query, &detail, &lexicon_summary, cancel)
                    .await?;
                if !query.ends_with('.') {
                    query.push('.');
                }
            }
        }

        if self.config.debug_level.at_least(DebugLevel::Basic) {
            debug.prolog_query = Some(query.clone());
        }

        let kb = assemble_kb(
            &session.knowledge_base(),
            &ontology_rules,
            options.dynamic_ontology.as_deref(),
        );
        if self.config.debug_level.at_least(DebugLevel::Verbose) {
            debug.kb_snapshot = Some(kb.clone());
        }

        let query_options = QueryOptions::new()
            .with_limit(self.config.query_limit)
            .with_trace(options.trace);
        let outcome = run_cancellable(
            cancel,
            self.reasoner.consult_and_query(&kb, &query, &query_options),
        )
        .await?;

        if self.config.debug_level.at_least(DebugLevel::Basic) {
            debug.prolog_results = Some(serde_json::to_value(&outcome.solutions)?);
            debug.proof_trace = outcome.trace.clone();
        }

        // Compose the NL answer from the symbolic results.
        let results_json = serde_json::to_string(&outcome.solutions)?;
        let vars = string_vars(&[
            ("naturalLanguageQuestion", nl_question),
            ("prologResultsJSON", &results_json),
            ("style", &options.style),
        ]);
        let rendered = self.prompts.format(prompts::LOGIC_TO_NL_ANSWER, &vars)?;
        let response = run_cancellable(
            cancel,
            self.llm
                .generate(&rendered.system, &rendered.user, &GenerateOptions::new()),
        )
        .await?;
        if let Some(cost) = response.cost {
            debug.costs.push(cost);
        }
        let answer = response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::LlmEmptyResponse)?;

        let mut explanation = None;
        if options.trace {
            let trace_json = serde_json::to_string(&outcome.trace)?;
            let vars = string_vars(&[
                ("naturalLanguageQuestion", nl_question),
                ("proofTraceJSON", &trace_json),
            ]);
            let rendered = self.prompts.format(prompts::LOGIC_TRACE_TO_NL, &vars)?;
            match run_cancellable(
                cancel,
                self.llm
                    .generate(&rendered.system, &rendered.user, &GenerateOptions::new()),
            )
            .await
            {
                Ok(resp) => {
                    if let Some(cost) = resp.cost {
                        debug.costs.push(cost);
                    }
                    explanation = resp.text.filter(|t| !t.trim().is_empty());
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                // Explanation is best-effort; the answer already stands.
                Err(e) => tracing::warn!(error = %e, "proof explanation failed"),
            }
        }

        Ok(QueryResponse {
            success: true,
            answer: Some(answer),
            explanation,
            message: None,
            error: None,
            details: None,
            strategy_id: Some(strategy.id.clone()),
            debug_info: self.debug_slot(debug),
        })
    }

    /// Explain what the generated query will ask, without running it.
    pub async fn explain_query(&self, session_id: &str, nl_question: &str) -> ExplainResponse {
        match self.explain_inner(session_id, nl_question).await {
            Ok(response) => response,
            Err(e) => ExplainResponse::failure(&e),
        }
    }

    async fn explain_inner(&self, session_id: &str, nl_question: &str) -> Result<ExplainResponse> {
        let session = self.require_session(session_id).await?;
        let strategy = self.select_strategy(Operation::Query, nl_question).await?;

        let mut debug = DebugInfo::default();
        if self.config.debug_level.at_least(DebugLevel::Basic) {
            debug.strategy_id = Some(strategy.id.clone());
        }
        let ontology_rules = self.fetch_ontology(&mut debug).await;

        let mut context = self.base_context(&session, &ontology_rules);
        context.insert(
            "naturalLanguageQuestion".to_string(),
            Value::Text(nl_question.to_string()),
        );
        let result = self.run_strategy(&strategy, context, None).await?;
        let query = query_from_value(result)?;
        if self.config.debug_level.at_least(DebugLevel::Basic) {
            debug.prolog_query = Some(query.clone());
        }

        let facts = session.knowledge_base();
        let vars = string_vars(&[
            ("naturalLanguageQuestion", nl_question),
            ("prologQuery", &query),
            ("sessionFacts", &facts),
            ("ontologyRules", &ontology_rules),
        ]);
        let rendered = self.prompts.format(prompts::EXPLAIN_PROLOG_QUERY, &vars)?;
        let response = self
            .llm
            .generate(&rendered.system, &rendered.user, &GenerateOptions::new())
            .await?;
        if let Some(cost) = response.cost {
            debug.costs.push(cost);
        }
        let explanation = response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::EmptyExplanation)?;

        Ok(ExplainResponse {
            success: true,
            explanation: Some(explanation),
            message: None,
            error: None,
            details: None,
            debug_info: self.debug_slot(debug),
        })
    }

    // ==================== Session-free translation ====================

    /// Translate natural language directly into rules, with no session.
    pub async fn translate_nl_to_rules(
        &self,
        nl_text: &str,
        strategy_id: Option<&str>,
    ) -> TranslateRulesResponse {
        match self.translate_rules_inner(nl_text, strategy_id).await {
            Ok(response) => response,
            Err(e) => TranslateRulesResponse::failure(&e),
        }
    }

    async fn translate_rules_inner(
        &self,
        nl_text: &str,
        strategy_id: Option<&str>,
    ) -> Result<TranslateRulesResponse> {
        let strategy = match strategy_id {
            Some(id) => self
                .strategies
                .get(id)
                .ok_or_else(|| Error::StrategyNotFound(id.to_string()))?,
            None => self.select_strategy(Operation::Assert, nl_text).await?,
        };

        // Empty translation context: same plumbing, no session state.
        let mut context: HashMap<String, Value> = HashMap::new();
        context.insert("naturalLanguageText".to_string(), Value::Text(nl_text.to_string()));
        context.insert("existingFacts".to_string(), Value::Text(String::new()));
        context.insert("ontologyRules".to_string(), Value::Text(String::new()));
        context.insert(
            "lexiconSummary".to_string(),
            Value::Text("No predicates defined yet.".to_string()),
        );
        context.insert(
            "llm_model_id".to_string(),
            Value::Text(self.llm.model_id()),
        );

        let result = self.run_strategy(&strategy, context, None).await?;
        let rules = clauses_from_value(result)?;

        if rules.is_empty() {
            return Ok(TranslateRulesResponse {
                success: true,
                rules: Vec::new(),
                message: Some("No rules could be extracted from the input.".to_string()),
                error: Some(ErrorCode::NoRulesExtracted),
                details: None,
                strategy_id: Some(strategy.id.clone()),
            });
        }

        for rule in &rules {
            let verdict = self.reasoner.validate(rule).await?;
            if !verdict.valid {
                return Err(Error::InvalidGeneratedProlog {
                    clause: rule.clone(),
                    detail: verdict
                        .error
                        .unwrap_or_else(|| "clause rejected by the reasoner".to_string()),
                });
            }
        }

        Ok(TranslateRulesResponse {
            success: true,
            rules,
            message: None,
            error: None,
            details: None,
            strategy_id: Some(strategy.id.clone()),
        })
    }

    /// Translate Prolog rules back into natural language with a single
    /// LLM pass.
    pub async fn translate_rules_to_nl(
        &self,
        rules: &[String],
        style: Option<&str>,
    ) -> TranslateTextResponse {
        match self.translate_text_inner(rules, style).await {
            Ok(response) => response,
            Err(e) => TranslateTextResponse::failure(&e),
        }
    }

    async fn translate_text_inner(
        &self,
        rules: &[String],
        style: Option<&str>,
    ) -> Result<TranslateTextResponse> {
        let joined = rules
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if joined.is_empty() {
            return Err(Error::EmptyRulesInput);
        }

        let vars = string_vars(&[
            ("prologRules", &joined),
            ("style", style.unwrap_or("conversational")),
        ]);
        let rendered = self.prompts.format(prompts::RULES_TO_NL_DIRECT, &vars)?;
        let response = self
            .llm
            .generate(&rendered.system, &rendered.user, &GenerateOptions::new())
            .await?;
        let text = response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::EmptyExplanation)?;

        Ok(TranslateTextResponse {
            success: true,
            text: Some(text),
            message: None,
            error: None,
            details: None,
        })
    }

    // ==================== Introspection ====================

    /// The prompt registry.
    pub fn get_prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    /// Render a prompt with placeholders filled, returning both raw and
    /// rendered forms. Unknown templates and missing placeholders are
    /// explicit errors.
    pub fn debug_format_prompt(
        &self,
        name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<PromptPreview> {
        let template = self.prompts.get(name)?.clone();
        let rendered = self.prompts.format(name, vars)?;
        Ok(PromptPreview {
            name: name.to_string(),
            template,
            system: rendered.system,
            user: rendered.user,
        })
    }

    // ==================== Shared plumbing ====================

    async fn require_session(&self, id: &str) -> Result<Session> {
        self.sessions
            .get_session(id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Ontology failures never abort a request; they surface in debug.
    async fn fetch_ontology(&self, debug: &mut DebugInfo) -> String {
        match self.ontology.global_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                tracing::warn!(error = %e, "ontology fetch failed, continuing without");
                debug.ontology_error = Some(e.to_string());
                String::new()
            }
        }
    }

    fn base_context(&self, session: &Session, ontology_rules: &str) -> HashMap<String, Value> {
        let mut context = HashMap::new();
        context.insert(
            "existingFacts".to_string(),
            Value::Text(session.knowledge_base()),
        );
        context.insert(
            "ontologyRules".to_string(),
            Value::Text(ontology_rules.to_string()),
        );
        context.insert(
            "lexiconSummary".to_string(),
            Value::Text(session.lexicon_summary()),
        );
        context.insert(
            "llm_model_id".to_string(),
            Value::Text(self.llm.model_id()),
        );
        context
    }

    async fn run_strategy(
        &self,
        strategy: &Strategy,
        context: HashMap<String, Value>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Value> {
        let executor = StrategyExecutor::new(self.llm.as_ref(), self.reasoner.as_ref());
        run_cancellable(cancel, executor.execute(strategy, context)).await
    }

    /// One refinement pass over an invalid clause: the `{base}-Refine`
    /// strategy when registered, otherwise a direct repair prompt.
    async fn refine_clause(
        &self,
        clause: &str,
        validation_error: &str,
        lexicon_summary: &str,
        cancel: Option<&CancelSignal>,
    ) -> Result<String> {
        let base = self.active_base_strategy.read().await.clone();
        if let Some(strategy) = self.strategies.get(&format!("{base}-Refine")) {
            let mut context = HashMap::new();
            context.insert("prologClause".to_string(), Value::Text(clause.to_string()));
            context.insert(
                "validationError".to_string(),
                Value::Text(validation_error.to_string()),
            );
            context.insert(
                "lexiconSummary".to_string(),
                Value::Text(lexicon_summary.to_string()),
            );
            let result = self.run_strategy(&strategy, context, cancel).await?;
            return match result {
                Value::Text(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
                Value::Clauses(mut c) if c.len() == 1 => Ok(c.remove(0)),
                other => Err(Error::StrategyInvalidOutput(format!(
                    "refinement strategy returned {} instead of a clause",
                    other.kind()
                ))),
            };
        }

        let vars = string_vars(&[
            ("prologClause", clause),
            ("validationError", validation_error),
            ("lexiconSummary", lexicon_summary),
        ]);
        let rendered = self.prompts.format(prompts::REFINE_PROLOG, &vars)?;
        let response = run_cancellable(
            cancel,
            self.llm
                .generate(&rendered.system, &rendered.user, &GenerateOptions::new()),
        )
        .await?;
        let text = response.text.ok_or(Error::LlmEmptyResponse)?;
        Ok(text.trim().to_string())
    }

    fn debug_slot(&self, debug: DebugInfo) -> Option<DebugInfo> {
        if self.config.debug_level.at_least(DebugLevel::Basic) && !debug.is_empty() {
            Some(debug)
        } else {
            None
        }
    }
}

/// The execution KB: session facts, then global ontologies, then the
/// optional per-query dynamic blob, with fixed separators.
fn assemble_kb(session_facts: &str, ontology_rules: &str, dynamic: Option<&str>) -> String {
    let mut kb = String::with_capacity(
        session_facts.len() + ontology_rules.len() + dynamic.map_or(0, str::len) + 96,
    );
    kb.push_str(session_facts);
    kb.push_str("\n% --- Global Ontologies ---\n");
    kb.push_str(ontology_rules);
    if let Some(dynamic) = dynamic {
        kb.push_str("\n% --- Dynamic RAG Ontology (Query-Specific) ---\n");
        kb.push_str(dynamic);
    }
    kb
}

/// A strategy's assert output must be a string array: either the
/// `Clauses` variant or a JSON array of strings.
fn clauses_from_value(value: Value) -> Result<Vec<String>> {
    match value {
        Value::Clauses(clauses) => Ok(clauses),
        Value::Json(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s),
                other => Err(Error::StrategyInvalidOutput(format!(
                    "expected an array of strings, found element {other}"
                ))),
            })
            .collect(),
        other => Err(Error::StrategyInvalidOutput(format!(
            "expected a clause array, got {}",
            other.kind()
        ))),
    }
}

/// A query strategy must yield a non-empty `.`-terminated string.
fn query_from_value(value: Value) -> Result<String> {
    let query = match value {
        Value::Text(q) => q.trim().to_string(),
        other => {
            return Err(Error::StrategyInvalidOutput(format!(
                "expected a query string, got {}",
                other.kind()
            )))
        }
    };
    if query.is_empty() || !query.ends_with('.') {
        return Err(Error::StrategyInvalidOutput(format!(
            "expected a '.'-terminated Prolog query, got {query:?}"
        )));
    }
    Ok(query)
}

fn string_vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
