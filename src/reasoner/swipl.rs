//! SWI-Prolog subprocess backend.
//!
//! Each call spawns a fresh `swipl` process — no engine state survives
//! between requests. The process loads a harness program that consults the
//! knowledge base term-by-term (so syntax errors are caught, not printed
//! past), runs the query under an inference limit, and reports results as
//! JSON lines on stdout:
//!
//! ```text
//! {"status":"solution","bindings":{"X":"socrates"}}
//! {"status":"solution","bindings":{},"trace":{"goal":"...","children":[...]}}
//! {"status":"done","limit_exceeded":false}
//! ```
//!
//! Proof capture uses a vanilla meta-interpreter over `clause/2`, so the
//! recorded goals carry the bindings in effect at each step.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::reasoner::trace::format_proof_tree;
use crate::reasoner::{ProofNode, QueryOptions, QueryOutcome, Reasoner, Solution, Validation};

const HARNESS: &str = r#"
:- use_module(library(http/json)).
:- use_module(library(solution_sequences)).
:- set_prolog_flag(unknown, fail).

main :-
    current_prolog_flag(argv, Argv),
    (   Argv = [Mode, KbFile | Rest]
    ->  true
    ;   halt(2)
    ),
    (   catch(consult_kb(KbFile), KbError,
              (emit_status(consult_error, KbError), halt(0)))
    ->  true
    ;   emit(_{status: "consult_error", error: "knowledge base rejected"}),
        halt(0)
    ),
    (   Mode == validate
    ->  emit(_{status: "done", limit_exceeded: false}),
        halt(0)
    ;   true
    ),
    Rest = [QueryAtom, LimitAtom, BudgetAtom, TraceAtom],
    atom_number(LimitAtom, Limit),
    atom_number(BudgetAtom, Budget),
    (   catch(atom_to_term(QueryAtom, Query, Bindings), QueryError,
              (emit_status(query_error, QueryError), halt(0)))
    ->  true
    ;   emit(_{status: "query_error", error: "query rejected"}),
        halt(0)
    ),
    run_query(Query, Bindings, Limit, Budget, TraceAtom),
    halt(0).

consult_kb(File) :-
    setup_call_cleanup(open(File, read, Stream),
                       load_stream(Stream),
                       close(Stream)).

load_stream(Stream) :-
    read_term(Stream, Term, []),
    (   Term == end_of_file
    ->  true
    ;   assert_term(Term),
        load_stream(Stream)
    ).

assert_term((:- Goal)) :- !,
    ignore(catch(call(Goal), _, fail)).
assert_term(Term) :-
    assertz(Term).

run_query(Query, Bindings, Limit, Budget, TraceAtom) :-
    (   call_with_inference_limit(
            enumerate(Query, Bindings, Limit, TraceAtom),
            Budget, Outcome)
    ->  (   Outcome == inference_limit_exceeded
        ->  emit(_{status: "done", limit_exceeded: true})
        ;   emit(_{status: "done", limit_exceeded: false})
        )
    ;   emit(_{status: "done", limit_exceeded: false})
    ).

enumerate(Query, Bindings, Limit, TraceAtom) :-
    forall(limit(Limit, solution(Query, Bindings, TraceAtom)), true).

solution(Query, Bindings, true) :- !,
    mi_prove(Query, Tree),
    catch(emit_answer(Bindings, Tree), Error,
          emit_status(answer_error, Error)).
solution(Query, Bindings, _) :-
    call(Query),
    catch(emit_answer(Bindings, null), Error,
          emit_status(answer_error, Error)).

emit_answer(Bindings, Tree) :-
    bindings_dict(Bindings, Dict),
    (   Tree == null
    ->  emit(_{status: "solution", bindings: Dict})
    ;   tree_json(Tree, TreeJson),
        emit(_{status: "solution", bindings: Dict, trace: TreeJson})
    ).

bindings_dict(Bindings, Dict) :-
    findall(Name-Text,
            ( member(Name=Var, Bindings),
              \+ sub_atom(Name, 0, 1, _, '_'),
              term_string(Var, Text)
            ),
            Pairs),
    dict_pairs(Dict, _, Pairs).

mi_prove(Goal, node(Text, Children)) :-
    mi(Goal, Children),
    term_string(Goal, Text).

mi(true, []) :- !.
mi((A, B), Tree) :- !,
    mi(A, TreeA),
    mi(B, TreeB),
    append(TreeA, TreeB, Tree).
mi((A ; B), Tree) :- !,
    ( mi(A, Tree) ; mi(B, Tree) ).
mi(\+ Goal, [node(Text, [])]) :- !,
    \+ mi(Goal, _),
    term_string(\+ Goal, Text).
mi(not(Goal), [node(Text, [])]) :- !,
    \+ mi(Goal, _),
    term_string(not(Goal), Text).
mi(Goal, [node(Text, [])]) :-
    predicate_property(Goal, built_in), !,
    call(Goal),
    term_string(Goal, Text).
mi(Goal, [node(Text, Children)]) :-
    clause(Goal, Body),
    mi(Body, Children),
    term_string(Goal, Text).

tree_json(node(Text, Children), _{goal: Text, children: ChildJson}) :-
    maplist(tree_json, Children, ChildJson).

emit(Dict) :-
    json_write_dict(current_output, Dict, [width(0)]),
    nl,
    flush_output.

emit_status(Status, Error) :-
    term_string(Error, Text),
    atom_string(Status, StatusText),
    emit(_{status: StatusText, error: Text}).
"#;

/// Configuration for the SWI-Prolog backend.
#[derive(Debug, Clone)]
pub struct SwiplConfig {
    /// Path to the `swipl` executable. Looked up on PATH when `None`.
    pub swipl_path: Option<PathBuf>,
    /// Per-call inference budget. Exceeding it truncates the solution
    /// list; it does not error.
    pub step_budget: u64,
    /// Wall-clock timeout per engine call in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SwiplConfig {
    fn default() -> Self {
        Self {
            swipl_path: None,
            step_budget: 1_000_000,
            timeout_ms: 15_000,
        }
    }
}

/// Reasoner adapter over a `swipl` subprocess.
pub struct SwiplReasoner {
    path: PathBuf,
    config: SwiplConfig,
}

impl SwiplReasoner {
    /// Create an adapter, resolving the executable via PATH if needed.
    pub fn new(config: SwiplConfig) -> Result<Self> {
        let path = match &config.swipl_path {
            Some(path) => path.clone(),
            None => which::which("swipl")
                .map_err(|e| Error::Config(format!("swipl not found on PATH: {e}")))?,
        };
        Ok(Self { path, config })
    }

    /// Create an adapter with the default configuration.
    pub fn discover() -> Result<Self> {
        Self::new(SwiplConfig::default())
    }

    async fn run_engine(&self, kb: &str, extra_args: &[String]) -> Result<Vec<HarnessLine>> {
        let run_id = Uuid::new_v4();
        let tmp = std::env::temp_dir();
        let harness_path = tmp.join(format!("mcr-harness-{run_id}.pl"));
        let kb_path = tmp.join(format!("mcr-kb-{run_id}.pl"));

        tokio::fs::write(&harness_path, HARNESS).await?;
        tokio::fs::write(&kb_path, kb).await?;

        let result = self.spawn(&harness_path, &kb_path, extra_args).await;

        let _ = tokio::fs::remove_file(&harness_path).await;
        let _ = tokio::fs::remove_file(&kb_path).await;

        result
    }

    async fn spawn(
        &self,
        harness_path: &std::path::Path,
        kb_path: &std::path::Path,
        extra_args: &[String],
    ) -> Result<Vec<HarnessLine>> {
        let mode = if extra_args.is_empty() {
            "validate"
        } else {
            "query"
        };

        let mut cmd = Command::new(&self.path);
        cmd.arg("-q")
            .arg("-g")
            .arg("main")
            .arg("-t")
            .arg("halt")
            .arg(harness_path)
            .arg("--")
            .arg(mode)
            .arg(kb_path)
            .args(extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| Error::timeout(self.config.timeout_ms))?
            .map_err(|e| Error::SubprocessComm(format!("failed to run swipl: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = Vec::new();
        for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match serde_json::from_str::<HarnessLine>(line) {
                Ok(msg) => lines.push(msg),
                Err(e) => {
                    tracing::debug!(line, error = %e, "skipping unparseable engine output");
                }
            }
        }

        if lines.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::SubprocessComm(format!(
                "engine produced no output (exit: {:?}): {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(lines)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum HarnessLine {
    ConsultError {
        error: String,
    },
    QueryError {
        error: String,
    },
    Solution {
        bindings: BTreeMap<String, String>,
        #[serde(default)]
        trace: Option<Value>,
    },
    AnswerError {
        error: String,
    },
    Done {
        #[serde(default)]
        limit_exceeded: bool,
    },
}

#[async_trait]
impl Reasoner for SwiplReasoner {
    async fn consult_and_query(
        &self,
        kb: &str,
        query: &str,
        options: &QueryOptions,
    ) -> Result<QueryOutcome> {
        // atom_to_term wants the bare term, not a clause.
        let query_term = query.trim().trim_end_matches('.');
        let args = vec![
            query_term.to_string(),
            options.limit.to_string(),
            self.config.step_budget.to_string(),
            options.trace.to_string(),
        ];

        let lines = self.run_engine(kb, &args).await?;

        let mut solutions = Vec::new();
        let mut trace: Option<ProofNode> = None;
        let mut limit_exceeded = false;

        for line in lines {
            match line {
                HarnessLine::ConsultError { error } => return Err(Error::KbSyntax(error)),
                HarnessLine::QueryError { error } => return Err(Error::QuerySyntax(error)),
                HarnessLine::AnswerError { error } => {
                    return Err(Error::AnswerProcessing(error));
                }
                HarnessLine::Solution { bindings, trace: t } => {
                    solutions.push(Solution::from_bindings(bindings));
                    if trace.is_none() {
                        if let Some(native) = t {
                            trace = format_proof_tree(&native);
                        }
                    }
                }
                HarnessLine::Done {
                    limit_exceeded: exceeded,
                } => limit_exceeded = exceeded,
            }
        }

        Ok(QueryOutcome {
            solutions,
            trace,
            limit_exceeded,
        })
    }

    async fn validate(&self, kb: &str) -> Result<Validation> {
        let lines = self.run_engine(kb, &[]).await?;
        for line in lines {
            match line {
                HarnessLine::ConsultError { error } => return Ok(Validation::invalid(error)),
                HarnessLine::Done { .. } => return Ok(Validation::ok()),
                _ => {}
            }
        }
        Err(Error::SubprocessComm(
            "engine ended without a validation verdict".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Option<SwiplReasoner> {
        // Engine tests only run where SWI-Prolog is installed.
        SwiplReasoner::discover().ok()
    }

    #[tokio::test]
    async fn test_query_with_bindings() {
        let Some(reasoner) = engine() else { return };
        let kb = "man(socrates).\nman(plato).\nmortal(X) :- man(X).\n";
        let outcome = reasoner
            .consult_and_query(kb, "mortal(X).", &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.solutions.len(), 2);
        let mut expected = BTreeMap::new();
        expected.insert("X".to_string(), "socrates".to_string());
        assert_eq!(outcome.solutions[0], Solution::Bindings(expected));
    }

    #[tokio::test]
    async fn test_ground_query_yields_true_sentinel() {
        let Some(reasoner) = engine() else { return };
        let outcome = reasoner
            .consult_and_query("is_blue(sky).\n", "is_blue(sky).", &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.solutions, vec![Solution::True]);
    }

    #[tokio::test]
    async fn test_solution_limit_is_honored() {
        let Some(reasoner) = engine() else { return };
        let kb = "n(1).\nn(2).\nn(3).\nn(4).\n";
        let outcome = reasoner
            .consult_and_query(kb, "n(X).", &QueryOptions::new().with_limit(2))
            .await
            .unwrap();
        assert_eq!(outcome.solutions.len(), 2);
    }

    #[tokio::test]
    async fn test_kb_syntax_error() {
        let Some(reasoner) = engine() else { return };
        let err = reasoner
            .consult_and_query("not-a-clause", "true.", &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KbSyntax(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_query_syntax_error() {
        let Some(reasoner) = engine() else { return };
        let err = reasoner
            .consult_and_query("a.\n", "b(", &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QuerySyntax(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_validate_accepts_and_rejects() {
        let Some(reasoner) = engine() else { return };
        let ok = reasoner.validate("man(socrates).\n").await.unwrap();
        assert!(ok.valid);

        let bad = reasoner.validate("man(socrates") .await.unwrap();
        assert!(!bad.valid);
        assert!(bad.error.is_some());
    }

    #[tokio::test]
    async fn test_trace_captures_rule_application() {
        let Some(reasoner) = engine() else { return };
        let kb = "man(socrates).\nmortal(X) :- man(X).\n";
        let outcome = reasoner
            .consult_and_query(kb, "mortal(socrates).", &QueryOptions::new().with_trace(true))
            .await
            .unwrap();
        let trace = outcome.trace.expect("trace requested");
        assert!(trace.goal.contains("mortal"));
        assert_eq!(trace.children.len(), 1);
        assert!(trace.children[0].goal.contains("man"));
    }

    #[tokio::test]
    async fn test_unknown_predicate_fails_quietly() {
        let Some(reasoner) = engine() else { return };
        let outcome = reasoner
            .consult_and_query("a.\n", "ghost(X).", &QueryOptions::default())
            .await
            .unwrap();
        assert!(outcome.solutions.is_empty());
    }
}
