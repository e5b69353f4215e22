//! Symbolic reasoner boundary.
//!
//! The reasoner is the only component with knowledge of the native engine;
//! everything else operates over strings, [`Solution`] lists, and
//! [`ProofNode`] trees. The bundled backend drives SWI-Prolog as a
//! subprocess; swapping engines means implementing [`Reasoner`].

mod swipl;
mod trace;
mod types;

pub use swipl::{SwiplConfig, SwiplReasoner};
pub use trace::{format_proof_tree, GOAL_MISSING, GOAL_UNFORMATTABLE, GOAL_UNKNOWN};
pub use types::{ProofNode, QueryOptions, QueryOutcome, Solution, Validation};

use async_trait::async_trait;

use crate::error::Result;

/// Contract every reasoner backend fulfills.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Consult `kb`, then enumerate up to `options.limit` solutions of
    /// `query`. Exceeding the engine's step budget returns the partial
    /// solution list with `limit_exceeded` set, not an error.
    async fn consult_and_query(
        &self,
        kb: &str,
        query: &str,
        options: &QueryOptions,
    ) -> Result<QueryOutcome>;

    /// Consult `kb` without querying. Engine-level rejections come back as
    /// `Validation { valid: false, .. }`; only infrastructure failures
    /// (missing binary, broken pipe) error.
    async fn validate(&self, kb: &str) -> Result<Validation>;
}
