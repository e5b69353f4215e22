//! Prompt template registry.
//!
//! Templates are `{system, user}` pairs with `{{placeholder}}` markers.
//! The registry ships the service-level prompts (answer composition, proof
//! explanation, direct rule translation, clause refinement); strategy
//! definitions carry their own node-level prompts inline.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Turns Prolog solutions into a natural-language answer.
pub const LOGIC_TO_NL_ANSWER: &str = "LOGIC_TO_NL_ANSWER";
/// Turns a proof trace into a natural-language explanation.
pub const LOGIC_TRACE_TO_NL: &str = "LOGIC_TRACE_TO_NL";
/// Explains what a Prolog query will ask, without running it.
pub const EXPLAIN_PROLOG_QUERY: &str = "EXPLAIN_PROLOG_QUERY";
/// Translates raw Prolog rules back to natural language.
pub const RULES_TO_NL_DIRECT: &str = "RULES_TO_NL_DIRECT";
/// Repairs a clause that failed validation, given the engine's error.
pub const REFINE_PROLOG: &str = "REFINE_PROLOG";

/// A prompt template: system text plus a user text with placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

/// A rendered prompt, keeping the raw user text for debug introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
    pub raw_user: String,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap())
}

/// Substitute `{{name}}` markers from `vars`. Unknown markers are left in
/// place for the caller to detect.
pub fn fill_placeholders(template: &str, vars: &HashMap<String, String>) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// First `{{name}}` marker remaining in `text`, if any.
pub(crate) fn first_unfilled(text: &str) -> Option<String> {
    placeholder_re()
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Registry of named prompt templates, read-only after construction.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    templates: HashMap<String, PromptTemplate>,
}

impl PromptRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in service prompts.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            LOGIC_TO_NL_ANSWER,
            PromptTemplate {
                system: "You translate symbolic reasoner output into clear answers. \
                         Answer only from the given results; if the results are empty, \
                         say that nothing in the knowledge base supports an answer."
                    .into(),
                user: "Question: {{naturalLanguageQuestion}}\n\
                       Reasoner results (JSON): {{prologResultsJSON}}\n\
                       Respond in a {{style}} style."
                    .into(),
            },
        );
        registry.register(
            LOGIC_TRACE_TO_NL,
            PromptTemplate {
                system: "You explain logic proof traces to non-experts. Walk through \
                         the goal tree from the root, one step per sentence."
                    .into(),
                user: "Question: {{naturalLanguageQuestion}}\n\
                       Proof trace (JSON): {{proofTraceJSON}}"
                    .into(),
            },
        );
        registry.register(
            EXPLAIN_PROLOG_QUERY,
            PromptTemplate {
                system: "You explain what a Prolog query will ask of a knowledge base, \
                         without executing it."
                    .into(),
                user: "Question: {{naturalLanguageQuestion}}\n\
                       Query: {{prologQuery}}\n\
                       Session facts:\n{{sessionFacts}}\n\
                       Global rules:\n{{ontologyRules}}\n\
                       Explain what the query asks and what kind of answer to expect."
                    .into(),
            },
        );
        registry.register(
            RULES_TO_NL_DIRECT,
            PromptTemplate {
                system: "You translate Prolog rules into natural language.".into(),
                user: "Rules:\n{{prologRules}}\n\
                       Describe what these rules mean in a {{style}} style."
                    .into(),
            },
        );
        registry.register(
            REFINE_PROLOG,
            PromptTemplate {
                system: "You repair a single malformed Prolog clause. Output only the \
                         corrected clause, ending with a period. Reuse the predicates \
                         listed in the lexicon where possible."
                    .into(),
                user: "Clause: {{prologClause}}\n\
                       Validation error: {{validationError}}\n\
                       Known predicates:\n{{lexiconSummary}}"
                    .into(),
            },
        );
        registry
    }

    /// Register (or replace) a template.
    pub fn register(&mut self, name: impl Into<String>, template: PromptTemplate) {
        self.templates.insert(name.into(), template);
    }

    /// Look up a template by name.
    pub fn get(&self, name: &str) -> Result<&PromptTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| Error::PromptTemplateNotFound(name.to_string()))
    }

    /// All registered templates, for introspection.
    pub fn all(&self) -> &HashMap<String, PromptTemplate> {
        &self.templates
    }

    /// Render a template with the given variables.
    ///
    /// Placeholders are filled in both parts; a marker left unfilled in the
    /// *user* text is an error naming the missing placeholder.
    pub fn format(&self, name: &str, vars: &HashMap<String, String>) -> Result<RenderedPrompt> {
        let template = self.get(name)?;
        let system = fill_placeholders(&template.system, vars);
        let user = fill_placeholders(&template.user, vars);
        if let Some(placeholder) = first_unfilled(&user) {
            return Err(Error::PromptFormatting {
                template: name.to_string(),
                placeholder,
            });
        }
        Ok(RenderedPrompt {
            system,
            user,
            raw_user: template.user.clone(),
        })
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fill_replaces_known_placeholders() {
        let out = fill_placeholders(
            "Q: {{question}} S: {{style}}",
            &vars(&[("question", "Is the sky blue?"), ("style", "formal")]),
        );
        assert_eq!(out, "Q: Is the sky blue? S: formal");
    }

    #[test]
    fn test_fill_leaves_unknown_placeholders() {
        let out = fill_placeholders("{{known}} {{unknown}}", &vars(&[("known", "yes")]));
        assert_eq!(out, "yes {{unknown}}");
    }

    #[test]
    fn test_format_reports_missing_placeholder_by_name() {
        let registry = PromptRegistry::with_defaults();
        let err = registry
            .format(LOGIC_TO_NL_ANSWER, &vars(&[("style", "conversational")]))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PromptFormattingFailed);
        match err {
            Error::PromptFormatting { placeholder, .. } => {
                assert_eq!(placeholder, "naturalLanguageQuestion");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_format_unknown_template() {
        let registry = PromptRegistry::with_defaults();
        let err = registry.format("NOPE", &HashMap::new()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PromptTemplateNotFound);
    }

    #[test]
    fn test_format_keeps_raw_user() {
        let registry = PromptRegistry::with_defaults();
        let rendered = registry
            .format(
                RULES_TO_NL_DIRECT,
                &vars(&[("prologRules", "a."), ("style", "formal")]),
            )
            .unwrap();
        assert!(rendered.raw_user.contains("{{prologRules}}"));
        assert!(rendered.user.contains("a."));
    }
}
