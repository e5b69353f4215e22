//! LLM adapter boundary.
//!
//! The service and strategy executor only ever see the [`LlmAdapter`]
//! trait: one `generate(system, user, options)` call returning text and an
//! opaque cost object. The crate bundles an Anthropic implementation;
//! further providers live outside and implement the same trait.

mod client;
mod types;

pub use client::{AnthropicAdapter, AnthropicConfig};
pub use types::{GenerateOptions, GenerateResponse};

use async_trait::async_trait;

use crate::error::Result;

/// The single LLM contract the core depends on.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Generate a completion for the given system and user prompts.
    ///
    /// A `text` of `None` is a valid "empty" response; transport and API
    /// failures are returned as errors.
    async fn generate(
        &self,
        system: &str,
        user: &str,
        options: &GenerateOptions,
    ) -> Result<GenerateResponse>;

    /// Identifier of the model this adapter targets by default, used for
    /// routing and performance-record lookups.
    fn model_id(&self) -> String;
}
