//! Translation strategies: swappable dataflow graphs that turn natural
//! language into Prolog (and back) by orchestrating LLM calls and
//! symbolic transforms.
//!
//! A strategy is data (JSON), not code: the [`StrategyRegistry`] loads and
//! validates definitions, the [`StrategyExecutor`] interprets them over an
//! [`ExecutionState`] of typed [`Value`]s. The node set is closed; the
//! SIR and LF submodules hold the two deterministic Prolog synthesis
//! paths.

pub mod lf;
pub mod sir;

mod executor;
mod registry;
mod state;
mod term;
mod types;

pub use executor::StrategyExecutor;
pub use registry::StrategyRegistry;
pub use state::{ExecutionState, Value};
pub use types::{Branch, BranchCondition, NodeKind, Strategy, StrategyEdge, StrategyNode};
