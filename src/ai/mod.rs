//! Completion backends
//!
//! One capability trait, [`CompletionClient`], with an implementation per
//! provider API. Each implementation turns the same [`Prompt`] into its own
//! request envelope and normalizes the response into plain text and a shared
//! error taxonomy, so the reply pipeline never branches on the provider.

pub mod providers;

use async_trait::async_trait;
use std::sync::Arc;

use crate::autoreply::config::{Backend, ReplyConfig};

pub use providers::anthropic::AnthropicClient;
pub use providers::openai::OpenAiClient;

/// Fixed first paragraph of every system prompt
pub const SYSTEM_PREAMBLE: &str = "You are a Habbo Origin GPT Bot made by QDave";

/// Errors from a completion call
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Transport failure, timeout, or non-2xx status
    #[error("Network error: {0}")]
    Network(String),

    /// 2xx response with an unexpected body shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 2xx response with no completion in it
    #[error("Empty response")]
    EmptyResponse,

    /// Missing or invalid credentials/settings; no request was made
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Network(err.to_string())
    }
}

/// Result type for completion calls
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Provider-agnostic prompt: instruction text plus one user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Build the prompt for `sender` asking `message`, given rendered context
    pub fn build(context: &str, sender: &str, message: &str, instructions: &str) -> Self {
        Self {
            system: format!("{SYSTEM_PREAMBLE}\n\n{instructions}"),
            user: format!("{context}\n\nThe User {sender} asks: {message}"),
        }
    }
}

/// A language-model backend that answers a [`Prompt`] with plain text
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Which backend this client talks to
    fn backend(&self) -> Backend;

    /// Send the prompt using model, credentials and sampling from `config`
    async fn complete(&self, prompt: &Prompt, config: &ReplyConfig) -> Result<String>;
}

/// One client per backend, selected by configuration at call time
#[derive(Clone)]
pub struct Providers {
    openai: Arc<dyn CompletionClient>,
    anthropic: Arc<dyn CompletionClient>,
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("openai", &self.openai.backend())
            .field("anthropic", &self.anthropic.backend())
            .finish()
    }
}

impl Providers {
    /// HTTP clients for both public APIs sharing one connection pool
    pub fn http() -> Result<Self> {
        let client = providers::build_client()?;
        Ok(Self {
            openai: Arc::new(OpenAiClient::new(client.clone())),
            anthropic: Arc::new(AnthropicClient::new(client)),
        })
    }

    /// Use custom client implementations
    pub fn new(openai: Arc<dyn CompletionClient>, anthropic: Arc<dyn CompletionClient>) -> Self {
        Self { openai, anthropic }
    }

    /// Client for `backend`
    pub fn get(&self, backend: Backend) -> Arc<dyn CompletionClient> {
        match backend {
            Backend::OpenAi => Arc::clone(&self.openai),
            Backend::Anthropic => Arc::clone(&self.anthropic),
        }
    }

    /// Complete with whichever backend `config` selects
    pub async fn complete(&self, prompt: &Prompt, config: &ReplyConfig) -> Result<String> {
        self.get(config.backend()).complete(prompt, config).await
    }
}
