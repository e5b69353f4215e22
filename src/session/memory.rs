//! Process-local session store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::session::{Session, SessionStore, SessionSummary};

/// In-memory session store.
///
/// Sessions live in a map behind a read-write lock; each session sits
/// behind its own mutex, so mutation of one session never blocks reads or
/// writes on another.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn handle(&self, id: &str) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, id: Option<String>) -> Result<Session> {
        let session = Session::new(id);
        let mut map = self.sessions.write().await;
        if let Some(existing) = map.get(&session.id) {
            return Ok(existing.lock().await.clone());
        }
        map.insert(session.id.clone(), Arc::new(Mutex::new(session.clone())));
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        match self.sessions.read().await.get(id) {
            Some(handle) => Ok(Some(handle.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn add_facts_with_embeddings(
        &self,
        id: &str,
        clauses: &[String],
        embeddings: Option<&[Vec<f32>]>,
    ) -> Result<Vec<String>> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        Ok(session.append_facts(clauses, embeddings))
    }

    async fn set_knowledge_base(&self, id: &str, text: &str) -> Result<()> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        session.replace_knowledge_base(text);
        Ok(())
    }

    async fn get_knowledge_base(&self, id: &str) -> Result<Option<String>> {
        match self.sessions.read().await.get(id) {
            Some(handle) => Ok(Some(handle.lock().await.knowledge_base())),
            None => Ok(None),
        }
    }

    async fn get_lexicon_summary(&self, id: &str) -> Result<Option<String>> {
        match self.sessions.read().await.get(id) {
            Some(handle) => Ok(Some(handle.lock().await.lexicon_summary())),
            None => Ok(None),
        }
    }

    async fn retract_fact(&self, id: &str, clause: &str) -> Result<bool> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        Ok(session.retract_fact(clause))
    }

    async fn record_triples(&self, id: &str, triples: &[(String, String, String)]) -> Result<()> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        let graph = session.kb_graph.get_or_insert_with(Default::default);
        for (s, p, o) in triples {
            graph.add_triple(s, p, o);
        }
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let map = self.sessions.read().await;
        let mut summaries = Vec::with_capacity(map.len());
        for handle in map.values() {
            let session = handle.lock().await;
            summaries.push(SessionSummary {
                id: session.id.clone(),
                created_at: session.created_at,
            });
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }
}
