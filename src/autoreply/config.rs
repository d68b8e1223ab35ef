//! Auto-reply Configuration
//!
//! Process-wide settings for the reply engine. The whole struct is replaced
//! atomically; nothing edits individual fields in place.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::ai::CompletionError;

/// OpenAI model ids offered by the settings UI
pub const OPENAI_MODELS: &[&str] = &[
    "gpt-3.5-turbo",
    "gpt-4",
    "gpt-4o-mini",
    "gpt-4o",
    "gpt-4-turbo",
    "gpt-3.5-turbo-0125",
    "gpt-4-0613",
    "gpt-4-32k-0613",
    "gpt-3.5-turbo-0613",
    "gpt-3.5-turbo-16k",
    "gpt-4-vision-preview",
];

/// Claude model ids offered by the settings UI
pub const CLAUDE_MODELS: &[&str] = &[
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
    "claude-3-5-sonnet-20240620",
];

const DEFAULT_INSTRUCTIONS: &str = "You are in the Game Habbo. Keep responses short and under 200 characters. Use modern internet shortcut language.";

/// Language-model backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// OpenAI chat completions
    OpenAi,
    /// Anthropic messages
    Anthropic,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::OpenAi => "openai",
            Backend::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model ids known to work with a backend
pub fn known_models(backend: Backend) -> &'static [&'static str] {
    match backend {
        Backend::OpenAi => OPENAI_MODELS,
        Backend::Anthropic => CLAUDE_MODELS,
    }
}

/// Reply engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplyConfig {
    /// Messages must start with this to trigger a reply (unless `respond_to_all`)
    #[serde(alias = "Prefix")]
    pub prefix: String,
    /// Global cooldown between replies, in seconds
    #[serde(alias = "ResponseDelay")]
    pub response_delay: u64,
    /// Number of trailing history lines included as context
    #[serde(alias = "PreviousChatCount")]
    pub previous_chat_count: usize,
    /// Use the Anthropic backend instead of OpenAI
    #[serde(rename = "useClaudeAPI", alias = "useClaudeApi", alias = "UseClaudeAPI")]
    pub use_claude_api: bool,
    #[serde(alias = "OpenAIModel", alias = "openAIModel")]
    pub openai_model: String,
    #[serde(alias = "ClaudeModel")]
    pub claude_model: String,
    #[serde(rename = "chatGPTApiKey", alias = "chatGptApiKey", alias = "ChatGPTApiKey")]
    pub chat_gpt_api_key: String,
    #[serde(alias = "ClaudeApiKey")]
    pub claude_api_key: String,
    /// Appended to the fixed system preamble
    #[serde(alias = "ChatInstructions")]
    pub chat_instructions: String,
    #[serde(alias = "Temperature")]
    pub temperature: f64,
    #[serde(alias = "MaxTokens")]
    pub max_tokens: u32,
    /// Senders never replied to (case-insensitive)
    #[serde(alias = "IgnoredUsers")]
    pub ignored_users: Vec<String>,
    /// Messages containing any of these are never replied to (case-insensitive)
    #[serde(alias = "BlacklistWords")]
    pub blacklist_words: Vec<String>,
    /// Reply to every message, prefix or not
    #[serde(alias = "RespondToAll")]
    pub respond_to_all: bool,
    /// Override for the OpenAI API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,
    /// Override for the Anthropic API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_base_url: Option<String>,
    /// Per-request transport timeout
    pub request_timeout_seconds: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            prefix: "+".to_string(),
            response_delay: 6,
            previous_chat_count: 20,
            use_claude_api: false,
            openai_model: OPENAI_MODELS[0].to_string(),
            claude_model: CLAUDE_MODELS[0].to_string(),
            chat_gpt_api_key: String::new(),
            claude_api_key: String::new(),
            chat_instructions: DEFAULT_INSTRUCTIONS.to_string(),
            temperature: 0.7,
            max_tokens: 100,
            ignored_users: Vec::new(),
            blacklist_words: Vec::new(),
            respond_to_all: false,
            openai_base_url: None,
            anthropic_base_url: None,
            request_timeout_seconds: 60,
        }
    }
}

impl ReplyConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected backend
    pub fn backend(&self) -> Backend {
        if self.use_claude_api {
            Backend::Anthropic
        } else {
            Backend::OpenAi
        }
    }

    /// Model id for the selected backend
    pub fn model(&self) -> &str {
        match self.backend() {
            Backend::OpenAi => &self.openai_model,
            Backend::Anthropic => &self.claude_model,
        }
    }

    /// API key for the selected backend, `None` when blank
    pub fn api_key(&self) -> Option<&str> {
        let key = match self.backend() {
            Backend::OpenAi => self.chat_gpt_api_key.trim(),
            Backend::Anthropic => self.claude_api_key.trim(),
        };
        (!key.is_empty()).then_some(key)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.response_delay)
    }

    /// Set the command prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Select a backend
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.use_claude_api = backend == Backend::Anthropic;
        self
    }

    /// Set the API key for a backend
    pub fn with_api_key(mut self, backend: Backend, key: impl Into<String>) -> Self {
        match backend {
            Backend::OpenAi => self.chat_gpt_api_key = key.into(),
            Backend::Anthropic => self.claude_api_key = key.into(),
        }
        self
    }

    /// Override the base URL for a backend
    pub fn with_base_url(mut self, backend: Backend, url: impl Into<String>) -> Self {
        match backend {
            Backend::OpenAi => self.openai_base_url = Some(url.into()),
            Backend::Anthropic => self.anthropic_base_url = Some(url.into()),
        }
        self
    }

    /// Per-request timeout; zero is rejected since it would fail every call
    pub fn request_timeout(&self) -> Result<Duration, CompletionError> {
        if self.request_timeout_seconds == 0 {
            return Err(CompletionError::Configuration(
                "requestTimeoutSeconds must be greater than zero".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.request_timeout_seconds))
    }

    /// Set the cooldown in seconds
    pub fn with_cooldown(mut self, seconds: u64) -> Self {
        self.response_delay = seconds;
        self
    }

    /// Reply to every message
    pub fn with_respond_to_all(mut self, respond_to_all: bool) -> Self {
        self.respond_to_all = respond_to_all;
        self
    }

    /// Set ignored senders
    pub fn with_ignored_users(mut self, users: Vec<String>) -> Self {
        self.ignored_users = users;
        self
    }

    /// Set blacklisted words
    pub fn with_blacklist(mut self, words: Vec<String>) -> Self {
        self.blacklist_words = words;
        self
    }

    /// Check that the selected backend can actually be called
    pub fn validate(&self) -> Result<(), CompletionError> {
        if self.api_key().is_none() {
            return Err(CompletionError::Configuration(format!(
                "no API key configured for {}",
                self.backend()
            )));
        }
        if self.model().trim().is_empty() {
            return Err(CompletionError::Configuration(format!(
                "no model configured for {}",
                self.backend()
            )));
        }
        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(CompletionError::Configuration(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        self.request_timeout()?;
        if self.max_tokens == 0 {
            return Err(CompletionError::Configuration(
                "maxTokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the selected model is one the UI knows about
    pub fn is_known_model(&self) -> bool {
        known_models(self.backend()).contains(&self.model())
    }

    /// Copy with API keys masked, for display
    pub fn redacted(&self) -> Self {
        let mask = |key: &str| {
            if key.is_empty() {
                String::new()
            } else {
                "[REDACTED]".to_string()
            }
        };
        Self {
            chat_gpt_api_key: mask(&self.chat_gpt_api_key),
            claude_api_key: mask(&self.claude_api_key),
            ..self.clone()
        }
    }
}
