//! Session data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::session::lexicon;

/// A named knowledge-base session.
///
/// Invariants the store maintains: every string in `facts` is a
/// `.`-terminated clause that passed shallow checks at insertion; every
/// lexicon entry is witnessed by a current clause; the embeddings key set
/// is a subset of the facts set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub lexicon: BTreeSet<String>,
    #[serde(default, with = "embedding_entries")]
    pub embeddings: HashMap<String, Vec<f32>>,
    #[serde(default)]
    pub kb_graph: Option<KnowledgeGraph>,
}

impl Session {
    /// Create a session, generating a UUID when no id is supplied.
    pub fn new(id: Option<String>) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            created_at: Utc::now(),
            facts: Vec::new(),
            lexicon: BTreeSet::new(),
            embeddings: HashMap::new(),
            kb_graph: None,
        }
    }

    /// The session's knowledge base: facts joined with newlines.
    pub fn knowledge_base(&self) -> String {
        self.facts.join("\n")
    }

    /// The formatted lexicon summary.
    pub fn lexicon_summary(&self) -> String {
        lexicon::lexicon_summary(&self.lexicon)
    }

    /// Append clauses, dropping empties and non-`.`-terminated strings
    /// with a warning. Returns the clauses actually kept. When embedding
    /// vectors are supplied they are matched to clauses by position.
    pub fn append_facts(
        &mut self,
        clauses: &[String],
        embeddings: Option<&[Vec<f32>]>,
    ) -> Vec<String> {
        let mut accepted = Vec::new();
        for (i, clause) in clauses.iter().enumerate() {
            let clause = clause.trim();
            if clause.is_empty() || !clause.ends_with('.') {
                tracing::warn!(clause, session = %self.id, "dropping malformed fact");
                continue;
            }
            self.facts.push(clause.to_string());
            if let Some(indicator) = lexicon::predicate_indicator(clause) {
                self.lexicon.insert(indicator);
            }
            if let Some(vectors) = embeddings {
                if let Some(vector) = vectors.get(i) {
                    self.embeddings.insert(clause.to_string(), vector.clone());
                }
            }
            accepted.push(clause.to_string());
        }
        accepted
    }

    /// Replace the facts wholesale and re-derive the lexicon. Embeddings
    /// for clauses no longer present are dropped.
    pub fn replace_knowledge_base(&mut self, text: &str) {
        self.facts = lexicon::split_clauses(text);
        self.rebuild_lexicon();
        let facts: BTreeSet<&String> = self.facts.iter().collect();
        self.embeddings.retain(|clause, _| facts.contains(clause));
    }

    /// Remove the first occurrence of an exact clause. Returns whether a
    /// clause was removed.
    pub fn retract_fact(&mut self, clause: &str) -> bool {
        let clause = clause.trim();
        let Some(pos) = self.facts.iter().position(|f| f == clause) else {
            return false;
        };
        self.facts.remove(pos);
        // Only drop the embedding when no duplicate copy remains.
        if !self.facts.iter().any(|f| f == clause) {
            self.embeddings.remove(clause);
        }
        self.rebuild_lexicon();
        true
    }

    fn rebuild_lexicon(&mut self) {
        self.lexicon = lexicon::derive_lexicon(self.facts.iter().map(String::as_str));
    }
}

/// Lightweight triple store attached to a session.
///
/// Node labels are interned into a vector and triples reference them by
/// index, keeping the shared structure free of owner cycles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    nodes: Vec<String>,
    triples: Vec<[usize; 3]>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a (subject, predicate, object) triple, interning labels.
    pub fn add_triple(&mut self, subject: &str, predicate: &str, object: &str) {
        let s = self.intern(subject);
        let p = self.intern(predicate);
        let o = self.intern(object);
        if !self.triples.contains(&[s, p, o]) {
            self.triples.push([s, p, o]);
        }
    }

    /// All triples as label tuples.
    pub fn triples(&self) -> Vec<(&str, &str, &str)> {
        self.triples
            .iter()
            .map(|[s, p, o]| {
                (
                    self.nodes[*s].as_str(),
                    self.nodes[*p].as_str(),
                    self.nodes[*o].as_str(),
                )
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    fn intern(&mut self, label: &str) -> usize {
        // The index is skipped during (de)serialization; rebuild lazily.
        if self.index.len() != self.nodes.len() {
            self.index = self
                .nodes
                .iter()
                .enumerate()
                .map(|(i, n)| (n.clone(), i))
                .collect();
        }
        if let Some(&i) = self.index.get(label) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(label.to_string());
        self.index.insert(label.to_string(), i);
        i
    }
}

impl PartialEq for KnowledgeGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.triples == other.triples
    }
}

/// Entry-list representation for the embeddings map, keeping session
/// files deterministic and tolerant of absent fields.
mod embedding_entries {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S: Serializer>(
        map: &HashMap<String, Vec<f32>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(&String, &Vec<f32>)> = map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<String, Vec<f32>>, D::Error> {
        let entries = Vec::<(String, Vec<f32>)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
