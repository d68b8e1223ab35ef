//! OpenAI Provider Implementation
//!
//! Chat Completions API: system and user turns in `messages`, bearer auth,
//! reply text at `choices[0].message.content`.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};

use crate::ai::{CompletionClient, CompletionError, Prompt, Result};
use crate::autoreply::config::{Backend, ReplyConfig};

/// Default OpenAI API base URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Build the request body
pub fn build_body(prompt: &Prompt, config: &ReplyConfig) -> Value {
    json!({
        "model": config.openai_model,
        "messages": [
            { "role": "system", "content": prompt.system },
            { "role": "user", "content": prompt.user },
        ],
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
    })
}

/// Extract the reply text from a response body
pub fn parse_response(body: &Value) -> Result<String> {
    let choice = super::first_element(body, "choices")?;
    choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            CompletionError::MalformedResponse("first choice has no message content".to_string())
        })
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn backend(&self) -> Backend {
        Backend::OpenAi
    }

    async fn complete(&self, prompt: &Prompt, config: &ReplyConfig) -> Result<String> {
        let api_key = config.chat_gpt_api_key.trim();
        if api_key.is_empty() {
            return Err(CompletionError::Configuration(
                "OpenAI API key is not set".to_string(),
            ));
        }

        let timeout = config.request_timeout()?;

        let base_url =
            super::resolve_base_url(config.openai_base_url.as_deref(), DEFAULT_OPENAI_BASE_URL);
        let url = format!("{base_url}/chat/completions");

        let request = self
            .client
            .post(&url)
            .header(AUTHORIZATION, super::header_value(&format!("Bearer {api_key}"))?);

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

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Prompt {
        Prompt::build("Previous Chatlog:\n", "Bob", "+hi", "Be brief.")
    }

    #[test]
    fn test_build_body() {
        let config = ReplyConfig::default();
        let body = build_body(&prompt(), &config);

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["temperature"], 0.7);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert!(messages[1]["content"]
            .as_str()
            .unwrap()
            .ends_with("The User Bob asks: +hi"));
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_parse_success() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "hey!"}}]});
        assert_eq!(parse_response(&body).unwrap(), "hey!");
    }

    #[test]
    fn test_parse_empty_choices() {
        let body = json!({"choices": []});
        assert!(matches!(
            parse_response(&body),
            Err(CompletionError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_missing_choices() {
        let body = json!({"error": {"message": "bad"}});
        assert!(matches!(
            parse_response(&body),
            Err(CompletionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_missing_content() {
        let body = json!({"choices": [{"message": {"role": "assistant"}}]});
        assert!(matches!(
            parse_response(&body),
            Err(CompletionError::MalformedResponse(_))
        ));

        let body = json!({"choices": [{"text": "legacy"}]});
        assert!(matches!(
            parse_response(&body),
            Err(CompletionError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let client = OpenAiClient::new(reqwest::Client::new());
        let err = client
            .complete(&prompt(), &ReplyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Configuration(_)));
    }
}
