//! LLM adapter request/response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for a single `generate` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Model to use (overrides the adapter's default).
    pub model: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 - 1.0).
    pub temperature: Option<f64>,
    /// Stop sequences.
    pub stop: Option<Vec<String>>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 1.0));
        self
    }
}

/// Result of a `generate` call.
///
/// `text: None` is a valid response meaning "the model returned nothing";
/// callers distinguish it from a transport error, which surfaces as `Err`.
/// `cost` is an opaque provider-specific object passed through unparsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: Option<String>,
    pub cost: Option<Value>,
}

impl GenerateResponse {
    /// Response carrying text and no cost data.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            cost: None,
        }
    }

    /// The empty response.
    pub fn empty() -> Self {
        Self::default()
    }
}
