//! Provider Implementations
//!
//! HTTP plumbing shared by the OpenAI and Anthropic clients.

pub mod anthropic;
pub mod openai;

use crate::ai::{CompletionError, Result};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

/// Longest slice of an error body kept in a log message
const MAX_ERROR_BODY: usize = 512;

/// Build the shared HTTP client
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| CompletionError::Network(format!("failed to build HTTP client: {e}")))
}

/// Resolve a configured base URL override, trimming any trailing slash
pub fn resolve_base_url<'a>(configured: Option<&'a str>, default: &'a str) -> &'a str {
    configured
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
}

/// Turn an API key into a header value without leaking it into the error
pub fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| CompletionError::Configuration("API key contains invalid characters".into()))
}

/// POST a JSON body and decode the JSON response.
///
/// Transport failures and non-2xx statuses become [`CompletionError::Network`];
/// a 2xx body that is not JSON is [`CompletionError::MalformedResponse`].
pub async fn post_json(
    request: reqwest::RequestBuilder,
    body: &Value,
    timeout: Duration,
) -> Result<Value> {
    let response = request
        .header(CONTENT_TYPE, "application/json")
        .timeout(timeout)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable>".to_string());
        return Err(CompletionError::Network(format!(
            "provider returned {status}: {}",
            truncate(&body, MAX_ERROR_BODY)
        )));
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CompletionError::MalformedResponse(format!("response is not JSON: {e}")))
}

/// Take the first element of the array at `key`.
///
/// Missing key or a non-array value is malformed; an empty array is empty.
pub fn first_element<'a>(body: &'a Value, key: &str) -> Result<&'a Value> {
    let items = body
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| CompletionError::MalformedResponse(format!("missing `{key}` array")))?;
    items.first().ok_or(CompletionError::EmptyResponse)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
