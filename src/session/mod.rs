//! Session knowledge-base storage.
//!
//! Two backends share one contract: [`MemorySessionStore`] keeps sessions
//! in a process-local map, [`FileSessionStore`] additionally serializes
//! every mutation to one JSON file per session with atomic writes. The
//! store exclusively owns session contents — callers get snapshot clones
//! and mutate through the API, where a per-session lock serializes the
//! get / compute / write-back sequence.

pub mod lexicon;

mod file;
mod memory;
mod types;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;
pub use types::{KnowledgeGraph, Session};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Summary row for session listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Contract shared by the in-memory and file-backed stores.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session, generating a UUID when no id is given. Creating
    /// an id that already exists returns the existing session.
    async fn create_session(&self, id: Option<String>) -> Result<Session>;

    /// Snapshot of a session, or `None`.
    async fn get_session(&self, id: &str) -> Result<Option<Session>>;

    /// Append clauses with optional positional embedding vectors; returns
    /// the clauses actually kept (empties and non-`.`-terminated strings
    /// are dropped with a warning).
    async fn add_facts_with_embeddings(
        &self,
        id: &str,
        clauses: &[String],
        embeddings: Option<&[Vec<f32>]>,
    ) -> Result<Vec<String>>;

    /// Append clauses without embeddings.
    async fn add_facts(&self, id: &str, clauses: &[String]) -> Result<Vec<String>> {
        self.add_facts_with_embeddings(id, clauses, None).await
    }

    /// Replace the session's facts wholesale and re-derive its lexicon.
    async fn set_knowledge_base(&self, id: &str, text: &str) -> Result<()>;

    /// Facts joined with newlines, or `None` when the session is unknown.
    async fn get_knowledge_base(&self, id: &str) -> Result<Option<String>>;

    /// Sorted `predicate/arity` listing for prompt injection, or `None`
    /// when the session is unknown.
    async fn get_lexicon_summary(&self, id: &str) -> Result<Option<String>>;

    /// Remove the first occurrence of an exact clause.
    async fn retract_fact(&self, id: &str, clause: &str) -> Result<bool>;

    /// Record knowledge-graph triples against the session.
    async fn record_triples(&self, id: &str, triples: &[(String, String, String)]) -> Result<()>;

    /// Delete a session. Returns whether one existed.
    async fn delete_session(&self, id: &str) -> Result<bool>;

    /// Enumerate sessions.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>>;
}
