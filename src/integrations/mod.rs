//! External integrations module.
//!
//! Provides the language-model boundary used by both answer paths:
//! - [`LanguageModel`]: the trait the responders depend on
//! - [`GroqClient`]: OpenAI-compatible chat completions (Groq by default)

pub mod groq;

use async_trait::async_trait;

use crate::Result;

pub use groq::{ChatMessage, GroqClient};

/// One chat-completion call: messages plus sampling parameters.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Content of the first message with the given role.
    pub fn content_of(&self, role: &str) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .and_then(|m| m.content.as_deref())
    }
}

/// Text completion service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}
