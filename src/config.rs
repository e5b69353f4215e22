//! Service configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How much debug payload responses carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    /// No debug info at all.
    None,
    /// Strategy identity, query, results, proof trace, ontology errors.
    Basic,
    /// Basic plus bulky artifacts: full KB snapshot, rendered prompts.
    Verbose,
}

impl DebugLevel {
    pub fn at_least(&self, level: DebugLevel) -> bool {
        (*self as u8) >= (level as u8)
    }
}

/// Configuration for [`crate::service::McrService`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McrConfig {
    /// Base strategy id; operations append `-Assert` / `-Query` /
    /// `-Refine` when picking concrete strategies.
    pub base_strategy_id: String,
    /// Final fallback for assert-shaped operations.
    pub default_assert_strategy_id: String,
    /// Final fallback for query-shaped operations.
    pub default_query_strategy_id: String,
    /// Upper bound on validation-guided refinement retries.
    pub max_refinement_iterations: u32,
    /// Solution limit handed to the reasoner per query.
    pub query_limit: usize,
    /// Debug payload level.
    pub debug_level: DebugLevel,
    /// Directory for the file-backed session store, `~`-expandable.
    pub session_dir: Option<String>,
}

impl Default for McrConfig {
    fn default() -> Self {
        Self {
            base_strategy_id: "SIR-R1".to_string(),
            default_assert_strategy_id: "SIR-R1-Assert".to_string(),
            default_query_strategy_id: "SIR-R1-Query".to_string(),
            max_refinement_iterations: 3,
            query_limit: 10,
            debug_level: DebugLevel::Basic,
            session_dir: None,
        }
    }
}

impl McrConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_strategy(mut self, id: impl Into<String>) -> Self {
        self.base_strategy_id = id.into();
        self
    }

    pub fn with_max_refinement_iterations(mut self, bound: u32) -> Self {
        self.max_refinement_iterations = bound;
        self
    }

    pub fn with_query_limit(mut self, limit: usize) -> Self {
        self.query_limit = limit;
        self
    }

    pub fn with_debug_level(mut self, level: DebugLevel) -> Self {
        self.debug_level = level;
        self
    }

    pub fn with_session_dir(mut self, dir: impl Into<String>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    /// Session directory with `~` expanded.
    pub fn expanded_session_dir(&self) -> Option<PathBuf> {
        self.session_dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).into_owned()))
    }
}
