//! Global ontology boundary.
//!
//! Ontologies are pools of Prolog rules living outside any session,
//! concatenated into the reasoner KB at query time. Storage is an
//! external collaborator; the crate defines the contract plus a static
//! in-memory source for defaults and tests. Fetch failures are non-fatal
//! to user requests — the service records them in debug info and reasons
//! over the session KB alone.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A named ontology, with rules included on request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
}

/// Supplier of global Prolog rules.
#[async_trait]
pub trait OntologySource: Send + Sync {
    /// Enumerate ontologies, optionally including their rule text.
    async fn list_ontologies(&self, include_rules: bool) -> Result<Vec<OntologyEntry>>;

    /// All global rules concatenated into one consultable string.
    async fn global_rules(&self) -> Result<String>;
}

/// Fixed in-memory ontology source.
#[derive(Debug, Clone, Default)]
pub struct StaticOntology {
    entries: Vec<(String, String)>,
}

impl StaticOntology {
    /// Source with no ontologies.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a named rule blob.
    pub fn with_ontology(mut self, name: impl Into<String>, rules: impl Into<String>) -> Self {
        self.entries.push((name.into(), rules.into()));
        self
    }
}

#[async_trait]
impl OntologySource for StaticOntology {
    async fn list_ontologies(&self, include_rules: bool) -> Result<Vec<OntologyEntry>> {
        Ok(self
            .entries
            .iter()
            .map(|(name, rules)| OntologyEntry {
                name: name.clone(),
                rules: include_rules.then(|| rules.clone()),
            })
            .collect())
    }

    async fn global_rules(&self) -> Result<String> {
        Ok(self
            .entries
            .iter()
            .map(|(_, rules)| rules.trim())
            .filter(|rules| !rules.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_source() {
        let source = StaticOntology::empty();
        assert!(source.list_ontologies(true).await.unwrap().is_empty());
        assert_eq!(source.global_rules().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_rules_concatenate_in_order() {
        let source = StaticOntology::empty()
            .with_ontology("base", "universal_rule.")
            .with_ontology("extra", "another_rule.\n");
        assert_eq!(
            source.global_rules().await.unwrap(),
            "universal_rule.\nanother_rule."
        );
    }

    #[tokio::test]
    async fn test_listing_respects_include_rules() {
        let source = StaticOntology::empty().with_ontology("base", "r.");
        let bare = source.list_ontologies(false).await.unwrap();
        assert_eq!(bare[0].name, "base");
        assert!(bare[0].rules.is_none());

        let full = source.list_ontologies(true).await.unwrap();
        assert_eq!(full[0].rules.as_deref(), Some("r."));
    }
}
