//! Anthropic Provider Implementation
//!
//! Messages API: instructions go in the top-level `system` string, a single
//! user turn in `messages`, reply text at `content[0].text`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::ai::{CompletionClient, CompletionError, Prompt, Result};
use crate::autoreply::config::{Backend, ReplyConfig};

/// Default Anthropic API base URL
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages client
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Build the request body
pub fn build_body(prompt: &Prompt, config: &ReplyConfig) -> Value {
    json!({
        "model": config.claude_model,
        "system": prompt.system,
        "messages": [
            { "role": "user", "content": prompt.user },
        ],
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
    })
}

/// Extract the reply text from a response body
pub fn parse_response(body: &Value) -> Result<String> {
    let block = super::first_element(body, "content")?;
    block
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            CompletionError::MalformedResponse("first content block has no text".to_string())
        })
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    fn backend(&self) -> Backend {
        Backend::Anthropic
    }

    async fn complete(&self, prompt: &Prompt, config: &ReplyConfig) -> Result<String> {
        let api_key = config.claude_api_key.trim();
        if api_key.is_empty() {
            return Err(CompletionError::Configuration(
                "Anthropic API key is not set".to_string(),
            ));
        }

        let timeout = config.request_timeout()?;

        let base_url = super::resolve_base_url(
            config.anthropic_base_url.as_deref(),
            DEFAULT_ANTHROPIC_BASE_URL,
        );
        let url = format!("{base_url}/messages");

        let request = self
            .client
            .post(&url)
            .header("x-api-key", super::header_value(api_key)?)
            .header("anthropic-version", ANTHROPIC_VERSION);

        let body = build_body(prompt, config);
        let response = super::post_json(
            request,
            &body,
            timeout,
        )
        .await?;

        parse_response(&response)
    }
}
