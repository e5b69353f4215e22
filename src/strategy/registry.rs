//! Strategy registry: load, validate, and address definitions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::strategy::types::Strategy;

const BUILTIN_DEFINITIONS: &[&str] = &[
    include_str!("../../strategies/sir-r1-assert.json"),
    include_str!("../../strategies/sir-r1-query.json"),
    include_str!("../../strategies/sir-r1-refine.json"),
    include_str!("../../strategies/lf-r1-assert.json"),
];

/// Holds validated strategies, addressable by id and by content hash.
///
/// Definitions are immutable once registered; lookups hand out shared
/// `Arc`s.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    by_id: HashMap<String, Arc<Strategy>>,
    by_hash: HashMap<String, Arc<Strategy>>,
}

impl StrategyRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in strategy set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for definition in BUILTIN_DEFINITIONS {
            registry
                .load_str(definition)
                .expect("built-in strategy definitions are valid");
        }
        registry
    }

    /// Register a strategy, validating it first. Returns its content
    /// hash. Re-registering an id replaces the old definition.
    pub fn register(&mut self, strategy: Strategy) -> Result<String> {
        strategy.validate()?;
        let hash = strategy.content_hash();
        let shared = Arc::new(strategy);
        if let Some(old) = self.by_id.insert(shared.id.clone(), Arc::clone(&shared)) {
            self.by_hash.remove(&old.content_hash());
        }
        self.by_hash.insert(hash.clone(), shared);
        Ok(hash)
    }

    /// Parse and register a JSON definition.
    pub fn load_str(&mut self, json: &str) -> Result<String> {
        let strategy: Strategy = serde_json::from_str(json)?;
        self.register(strategy)
    }

    /// Load every `*.json` file in a directory. Returns how many
    /// definitions were registered; files that fail to parse or validate
    /// abort the load.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let pattern = dir.as_ref().join("*.json");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| Error::Config("strategy dir is not valid UTF-8".to_string()))?;

        let mut loaded = 0;
        let entries =
            glob::glob(pattern).map_err(|e| Error::Config(format!("bad glob pattern: {e}")))?;
        for entry in entries {
            let path = entry.map_err(|e| Error::Config(format!("unreadable entry: {e}")))?;
            let json = std::fs::read_to_string(&path)?;
            let hash = self.load_str(&json)?;
            tracing::info!(file = %path.display(), hash = %hash, "loaded strategy");
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Look up by human-assigned id.
    pub fn get(&self, id: &str) -> Option<Arc<Strategy>> {
        self.by_id.get(id).cloned()
    }

    /// Look up by content hash.
    pub fn get_by_hash(&self, hash: &str) -> Option<Arc<Strategy>> {
        self.by_hash.get(hash).cloned()
    }

    /// Registered strategy ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.by_id.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtins_load_and_validate() {
        let registry = StrategyRegistry::with_builtins();
        assert_eq!(
            registry.ids(),
            vec![
                "LF-R1-Assert".to_string(),
                "SIR-R1-Assert".to_string(),
                "SIR-R1-Query".to_string(),
                "SIR-R1-Refine".to_string(),
            ]
        );
    }

    #[test]
    fn test_hash_lookup_matches_id_lookup() {
        let registry = StrategyRegistry::with_builtins();
        let by_id = registry.get("SIR-R1-Assert").unwrap();
        let by_hash = registry.get_by_hash(&by_id.content_hash()).unwrap();
        assert_eq!(by_id.id, by_hash.id);
    }

    #[test]
    fn test_unknown_lookups_are_none() {
        let registry = StrategyRegistry::with_builtins();
        assert!(registry.get("NOPE").is_none());
        assert!(registry.get_by_hash("deadbeef").is_none());
    }

    #[test]
    fn test_invalid_definition_is_rejected() {
        let mut registry = StrategyRegistry::new();
        let json = r#"{
            "id": "Bad", "name": "bad", "result_variable": "r",
            "nodes": [
                {"id": "a", "type": "Parse_JSON", "input_variable": "x", "output_variable": "y"},
                {"id": "a", "type": "Parse_JSON", "input_variable": "y", "output_variable": "z"}
            ],
            "edges": []
        }"#;
        assert!(registry.load_str(json).is_err());
    }

    #[test]
    fn test_reregistering_id_replaces_hash_entry() {
        let mut registry = StrategyRegistry::new();
        let base = r#"{
            "id": "S", "name": "one", "result_variable": "out",
            "nodes": [{"id": "n", "type": "Extract_Prolog_Query",
                       "input_variable": "in", "output_variable": "out"}],
            "edges": []
        }"#;
        let first_hash = registry.load_str(base).unwrap();
        let changed = base.replace("\"one\"", "\"two\"");
        let second_hash = registry.load_str(&changed).unwrap();

        assert_ne!(first_hash, second_hash);
        assert!(registry.get_by_hash(&first_hash).is_none());
        assert!(registry.get_by_hash(&second_hash).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("custom.json"),
            r#"{
                "id": "Custom-1", "name": "custom", "result_variable": "out",
                "nodes": [{"id": "n", "type": "Extract_Prolog_Query",
                           "input_variable": "in", "output_variable": "out"}],
                "edges": []
            }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = StrategyRegistry::new();
        let loaded = registry.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, 1);
        assert!(registry.get("Custom-1").is_some());
    }
}
