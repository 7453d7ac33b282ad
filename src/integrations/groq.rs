//! Groq API client (OpenAI-compatible chat completions).

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompletionRequest, LanguageModel};
use crate::config::DEFAULT_GROQ_BASE_URL;
use crate::{Error, Result};

/// Groq client. Works with any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct GroqClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl GroqClient {
    /// Create client from environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("GROQ_API_KEY")
            .map_err(|_| Error::Config("GROQ_API_KEY is not set".to_string()))?;
        Self::new(api_key)
    }

    /// Create client with API key.
    pub fn new<S: Into<String>>(api_key: S) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("GROQ_API_KEY is empty".to_string()));
        }

        let http = Client::builder()
            .user_agent(concat!("ecom_chatbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
        })
    }

    /// Point the client at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages,
            temperature,
            max_tokens,
        };

        debug!(model, "Sending chat completion request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::LlmError(format!("Groq request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::LlmError(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::LlmError(format!("Groq error {}: {}", status, text)));
        }

        let chat_response: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| Error::LlmError(format!("Invalid response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::LlmError("Empty response from Groq".to_string()))
    }
}

#[async_trait]
impl LanguageModel for GroqClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.chat_completion(
            request.messages,
            &request.model,
            request.temperature,
            request.max_tokens,
        )
        .await
    }
}

/// Chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", content)
    }

    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn new_rejects_blank_key() {
        let err = GroqClient::new("   ").unwrap_err();
        assert!(format!("{}", err).contains("empty"));
    }

    #[test]
    fn with_base_url_strips_trailing_slash() {
        let client = GroqClient::new("key")
            .unwrap()
            .with_base_url("http://localhost:11434/v1/");
        assert_eq!(client.base_url(), "http://localhost:11434/v1");
    }

    fn client(server: &MockServer) -> GroqClient {
        GroqClient::new("test_key")
            .expect("client")
            .with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn chat_completion_returns_first_choice_content() {
        let server = MockServer::start_async().await;

        let completion_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("Authorization", "Bearer test_key");
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "Orders ship within 2 days." } },
                    { "message": { "role": "assistant", "content": "ignored" } }
                ]
            }));
        });

        let reply = client(&server)
            .chat_completion(
                vec![ChatMessage::user("When will my order ship?")],
                "llama",
                Some(0.2),
                Some(32),
            )
            .await
            .unwrap();

        assert_eq!(reply, "Orders ship within 2 days.");
        completion_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn complete_sends_model_and_sampling_parameters() {
        let server = MockServer::start_async().await;

        let completion_mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                body.contains("\"model\":\"llama-3.3-70b-versatile\"")
                    && body.contains("\"max_tokens\":1024")
                    && body.contains("\"role\":\"system\"")
            });
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "<SQL>SELECT 1</SQL>" } }
                ]
            }));
        });

        let request = CompletionRequest::new(
            "llama-3.3-70b-versatile",
            vec![ChatMessage::system("schema"), ChatMessage::user("question")],
        )
        .temperature(0.2)
        .max_tokens(1024);

        let reply = client(&server).complete(request).await.unwrap();

        assert_eq!(reply, "<SQL>SELECT 1</SQL>");
        completion_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn optional_parameters_are_omitted_from_body() {
        let server = MockServer::start_async().await;

        let completion_mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                !body.contains("temperature") && !body.contains("max_tokens")
            });
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "I don't know." } }
                ]
            }));
        });

        let reply = client(&server)
            .chat_completion(vec![ChatMessage::user("Hi")], "llama", None, None)
            .await
            .unwrap();

        assert_eq!(reply, "I don't know.");
        completion_mock.assert_calls(1);
    }

    async fn failure_for(status: u16, body: &str) -> Error {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(status)
                .header("content-type", "application/json")
                .body(body);
        });

        client(&server)
            .chat_completion(vec![ChatMessage::user("Nike shoes?")], "llama", None, None)
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn http_errors_keep_status_and_body() {
        let err = failure_for(429, r#"{"error":{"message":"Rate limit reached"}}"#).await;
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("Rate limit reached"));
        assert_eq!(err.kind(), "generation_failure");
    }

    #[tokio::test]
    async fn malformed_payloads_are_generation_failures() {
        let cases = [
            ("<html>bad gateway</html>", "Invalid response"),
            (r#"{"choices":[]}"#, "Empty response from Groq"),
            (
                r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
                "Empty response from Groq",
            ),
        ];

        for (body, expected) in cases {
            let err = failure_for(200, body).await;
            assert!(err.to_string().contains(expected), "{body}: {err}");
            assert!(matches!(err, Error::LlmError(_)));
        }
    }

    #[test]
    fn chat_message_constructors_set_roles() {
        assert_eq!(ChatMessage::system("a").role, "system");
        assert_eq!(ChatMessage::user("b").role, "user");
        assert_eq!(ChatMessage::assistant("c").role, "assistant");
        assert_eq!(ChatMessage::user("b").content.as_deref(), Some("b"));
    }

    #[tokio::test]
    #[ignore] // Requires GROQ_API_KEY
    async fn live_completion_answers() {
        dotenvy::dotenv().ok();
        let client = GroqClient::from_env().unwrap();
        let reply = client
            .chat_completion(
                vec![ChatMessage::user("Reply with the single word: ok")],
                crate::config::DEFAULT_MODEL,
                Some(0.0),
                Some(8),
            )
            .await
            .unwrap();
        assert!(!reply.trim().is_empty());
    }
}
