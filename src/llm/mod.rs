//! LLM client abstraction layer.
//!
//! The decision engine talks to a language model through the [`LlmClient`]
//! trait so the retry and validation logic can be tested without a running
//! model server.
//!
//! # Architecture
//!
//! The [`LlmClient`] trait is:
//!
//! - **Object-safe**: Used as `Arc<dyn LlmClient>` by the decision engine
//! - **Thread-safe**: `Send + Sync` bounds enable usage across await points
//! - **Async-first**: Completion is async for non-blocking I/O
//!
//! # Example
//!
//! ```rust,ignore
//! use statecraft::llm::{CompletionRequest, LlmClient, OllamaProvider};
//!
//! let client = OllamaProvider::new("llama3.2:3b", None)?;
//! let reply = client.complete(&CompletionRequest::new("Pick 1 or 2")).await?;
//! ```

pub mod ollama;

pub use ollama::{OllamaApiError, OllamaProvider};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, StatecraftError};

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Prompt text.
    pub prompt: String,
    /// JSON schema the response must follow, when the backend supports it.
    pub response_format: Option<Value>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a request with only a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_format: None,
            temperature: None,
        }
    }

    /// Constrain the response to a JSON schema.
    #[must_use]
    pub fn with_response_format(mut self, schema: Value) -> Self {
        self.response_format = Some(schema);
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Abstraction for language-model completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a request and return the model's raw text reply.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the model server is unreachable or times
    /// out, or a parse error if the server's envelope cannot be decoded.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Name of the model being used.
    fn model_name(&self) -> &str;
}

/// Scripted reply for [`MockLlmClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail with a transport error carrying this message.
    Fail(String),
    /// Never answer; the caller's timeout must fire.
    Hang,
}

/// Mock LLM client for testing.
///
/// Replies are consumed from a script in order; once the script is empty the
/// fallback reply is used for every further call.
///
/// # Example
///
/// ```rust,ignore
/// use statecraft::llm::{MockLlmClient, MockReply};
///
/// let client = MockLlmClient::new()
///     .with_reply(MockReply::Fail("connection refused".into()))
///     .with_fallback(MockReply::Text("2".into()));
/// ```
#[derive(Debug)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    model: String,
    call_count: AtomicU32,
    prompts: Mutex<Vec<CompletionRequest>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: MockReply::Fail("Mock failure".to_string()),
            model: "mock-llm".to_string(),
            call_count: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl MockLlmClient {
    /// Create a new mock client that fails every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that always answers with the given text.
    #[must_use]
    pub fn answering(text: &str) -> Self {
        Self::new().with_fallback(MockReply::Text(text.to_string()))
    }

    /// Queue a reply.
    #[must_use]
    pub fn with_reply(self, reply: MockReply) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
        self
    }

    /// Set the reply used once the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Set the model name.
    #[must_use]
    pub fn with_model_name(mut self, name: &str) -> Self {
        self.model = name.to_string();
        self
    }

    /// Number of times `complete` was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.clone());
        }

        let reply = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(message) => {
                Err(StatecraftError::transport("model completion", message))
            }
            MockReply::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(StatecraftError::transport("model completion", "mock hang elapsed"))
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
