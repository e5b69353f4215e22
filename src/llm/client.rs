//! Bundled Anthropic-backed LLM adapter.
//!
//! Other providers stay external; this is the one concrete implementation
//! of the `generate` contract the crate ships with.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::llm::{GenerateOptions, GenerateResponse, LlmAdapter};

/// Configuration for the Anthropic adapter.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key.
    pub api_key: String,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Default model.
    pub default_model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Max retries on transient failure.
    pub max_retries: u32,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            default_model: "claude-3-5-sonnet-20241022".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Anthropic Messages API adapter.
pub struct AnthropicAdapter {
    config: AnthropicConfig,
    http: Client,
}

impl AnthropicAdapter {
    const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    const API_VERSION: &'static str = "2023-06-01";
    const DEFAULT_MAX_TOKENS: u32 = 4096;

    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
    }

    async fn send(&self, body: &ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}/v1/messages", self.base_url());
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
            }
            let response = self
                .http
                .post(&url)
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", Self::API_VERSION)
                .json(body)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<ApiResponse>()
                        .await
                        .map_err(|e| Error::llm_api("anthropic", e.to_string()));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    let message = serde_json::from_str::<ApiError>(&text)
                        .map(|e| e.error.message)
                        .unwrap_or(text);
                    let err = Error::llm_api("anthropic", format!("{status}: {message}"));
                    // Retry only on throttling and server-side failures.
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(Error::llm_api("anthropic", e.to_string()));
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::llm_api("anthropic", "request failed")))
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiContent>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl LlmAdapter for AnthropicAdapter {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        options: &GenerateOptions,
    ) -> Result<GenerateResponse> {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model.clone());

        let body = ApiRequest {
            model,
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
            max_tokens: options.max_tokens.unwrap_or(Self::DEFAULT_MAX_TOKENS),
            system: if system.is_empty() {
                None
            } else {
                Some(system.to_string())
            },
            temperature: options.temperature,
            stop_sequences: options.stop.clone(),
        };

        let response = self.send(&body).await?;

        let text = response
            .content
            .into_iter()
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");
        let text = if text.is_empty() { None } else { Some(text) };

        Ok(GenerateResponse {
            text,
            cost: Some(json!({
                "input_tokens": response.usage.input_tokens,
                "output_tokens": response.usage.output_tokens,
            })),
        })
    }

    fn model_id(&self) -> String {
        self.config.default_model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = AnthropicConfig::new("sk-test")
            .with_base_url("http://localhost:9999")
            .with_default_model("claude-3-5-haiku-20241022")
            .with_timeout(10);
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:9999"));
        assert_eq!(config.default_model, "claude-3-5-haiku-20241022");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_request_serialization_skips_empty_fields() {
        let body = ApiRequest {
            model: "m".into(),
            messages: vec![],
            max_tokens: 16,
            system: None,
            temperature: None,
            stop_sequences: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("system"));
        assert!(!json.contains("temperature"));
    }

    #[test]
    fn test_response_deserialization() {
        let raw = r#"{
            "content": [{"type": "text", "text": "man(socrates)."}],
            "usage": {"input_tokens": 12, "output_tokens": 7}
        }"#;
        let resp: ApiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.content[0].text.as_deref(), Some("man(socrates)."));
        assert_eq!(resp.usage.output_tokens, 7);
    }
}
