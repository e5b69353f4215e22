//! File-backed session store.
//!
//! One JSON file per session under a base directory, rewritten on every
//! mutation. Writes go to a `.tmp` sibling first and rename into place,
//! so an interrupted write leaves the previous version intact.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::session::{Session, SessionStore, SessionSummary};

/// Session store persisting each session to `<dir>/<id>.json`.
pub struct FileSessionStore {
    dir: PathBuf,
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl FileSessionStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Storage(format!("cannot create session dir: {e}")))?;
        Ok(Self {
            dir,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Session ids become file names, so constrain them.
    fn validate_id(id: &str) -> Result<()> {
        let ok = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if ok {
            Ok(())
        } else {
            Err(Error::Storage(format!("invalid session id: {id:?}")))
        }
    }

    async fn persist(&self, session: &Session) -> Result<()> {
        let path = self.session_path(&session.id);
        let tmp = self.dir.join(format!("{}.json.tmp", session.id));
        let json = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Error::Storage(format!("write failed: {e}")))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::Storage(format!("rename failed: {e}")))?;
        Ok(())
    }

    async fn load_from_disk(&self, id: &str) -> Result<Option<Session>> {
        let path = self.session_path(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let session = serde_json::from_str(&raw)
                    .map_err(|e| Error::Storage(format!("corrupt session file {path:?}: {e}")))?;
                Ok(Some(session))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("read failed: {e}"))),
        }
    }

    /// Cached handle, falling back to disk for sessions created by an
    /// earlier process.
    async fn handle(&self, id: &str) -> Result<Option<Arc<Mutex<Session>>>> {
        if let Some(handle) = self.sessions.read().await.get(id) {
            return Ok(Some(Arc::clone(handle)));
        }
        let Some(session) = self.load_from_disk(id).await? else {
            return Ok(None);
        };
        let mut map = self.sessions.write().await;
        // Another task may have loaded it while we read the file.
        let handle = map
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(session)));
        Ok(Some(Arc::clone(handle)))
    }

    async fn require(&self, id: &str) -> Result<Arc<Mutex<Session>>> {
        self.handle(id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create_session(&self, id: Option<String>) -> Result<Session> {
        let session = Session::new(id);
        Self::validate_id(&session.id)?;

        // Existing file wins: creation is idempotent.
        if let Some(handle) = self.handle(&session.id).await? {
            return Ok(handle.lock().await.clone());
        }

        self.persist(&session).await?;
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), Arc::new(Mutex::new(session.clone())));
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        match self.handle(id).await? {
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
        let handle = self.require(id).await?;
        let mut session = handle.lock().await;
        let accepted = session.append_facts(clauses, embeddings);
        self.persist(&session).await?;
        Ok(accepted)
    }

    async fn set_knowledge_base(&self, id: &str, text: &str) -> Result<()> {
        let handle = self.require(id).await?;
        let mut session = handle.lock().await;
        session.replace_knowledge_base(text);
        self.persist(&session).await
    }

    async fn get_knowledge_base(&self, id: &str) -> Result<Option<String>> {
        match self.handle(id).await? {
            Some(handle) => Ok(Some(handle.lock().await.knowledge_base())),
            None => Ok(None),
        }
    }

    async fn get_lexicon_summary(&self, id: &str) -> Result<Option<String>> {
        match self.handle(id).await? {
            Some(handle) => Ok(Some(handle.lock().await.lexicon_summary())),
            None => Ok(None),
        }
    }

    async fn retract_fact(&self, id: &str, clause: &str) -> Result<bool> {
        let handle = self.require(id).await?;
        let mut session = handle.lock().await;
        let removed = session.retract_fact(clause);
        if removed {
            self.persist(&session).await?;
        }
        Ok(removed)
    }

    async fn record_triples(&self, id: &str, triples: &[(String, String, String)]) -> Result<()> {
        let handle = self.require(id).await?;
        let mut session = handle.lock().await;
        let graph = session.kb_graph.get_or_insert_with(Default::default);
        for (s, p, o) in triples {
            graph.add_triple(s, p, o);
        }
        self.persist(&session).await
    }

    async fn delete_session(&self, id: &str) -> Result<bool> {
        let cached = self.sessions.write().await.remove(id).is_some();
        match tokio::fs::remove_file(self.session_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(cached),
            Err(e) => Err(Error::Storage(format!("delete failed: {e}"))),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::Storage(format!("list failed: {e}")))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Storage(format!("list failed: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load_from_disk(stem).await {
                Ok(Some(session)) => summaries.push(SessionSummary {
                    id: session.id,
                    created_at: session.created_at,
                }),
                Ok(None) => {}
                Err(e) => tracing::warn!(file = %path.display(), error = %e, "skipping session file"),
            }
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }
}

impl std::fmt::Debug for FileSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSessionStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn store(dir: &tempfile::TempDir) -> FileSessionStore {
        FileSessionStore::open(dir.path()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.create_session(Some("s1".into())).await.unwrap();
        assert!(dir.path().join("s1.json").exists());
    }

    #[tokio::test]
    async fn test_create_existing_file_returns_stored_session() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = store(&dir).await;
            store.create_session(Some("s1".into())).await.unwrap();
            store
                .add_facts("s1", &["man(socrates).".to_string()])
                .await
                .unwrap();
        }
        // A fresh store over the same directory sees the old contents.
        let reopened = store(&dir).await;
        let session = reopened.create_session(Some("s1".into())).await.unwrap();
        assert_eq!(session.facts, vec!["man(socrates).".to_string()]);
        assert!(session.lexicon.contains("man/1"));
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.create_session(Some("s1".into())).await.unwrap();
        store
            .add_facts_with_embeddings(
                "s1",
                &["a(x).".to_string()],
                Some(&[vec![0.5, 0.5]]),
            )
            .await
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("s1.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["facts"][0], "a(x).");
        assert_eq!(json["lexicon"][0], "a/1");
        assert_eq!(json["embeddings"][0][0], "a(x).");
    }

    #[tokio::test]
    async fn test_no_tmp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.create_session(Some("s1".into())).await.unwrap();
        store.add_facts("s1", &["a.".to_string()]).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        assert!(store
            .create_session(Some("../escape".into()))
            .await
            .is_err());
        assert!(store.create_session(Some("a/b".into())).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.create_session(Some("s1".into())).await.unwrap();
        assert!(store.delete_session("s1").await.unwrap());
        assert!(!dir.path().join("s1.json").exists());
        assert!(!store.delete_session("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_sessions_reads_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.create_session(Some("a".into())).await.unwrap();
        store.create_session(Some("b".into())).await.unwrap();
        let listed = store.list_sessions().await.unwrap();
        let ids: Vec<_> = listed.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_tolerates_minimal_session_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("old.json"),
            r#"{"id": "old", "createdAt": "2024-06-01T00:00:00Z", "facts": ["a."]}"#,
        )
        .unwrap();
        let store = store(&dir).await;
        let session = store.get_session("old").await.unwrap().unwrap();
        assert_eq!(session.facts, vec!["a.".to_string()]);
        assert!(session.embeddings.is_empty());
    }
}
