//! Ollama LLM provider implementation.
//!
//! This module provides an Ollama client that implements the [`LlmClient`]
//! trait for local inference over Ollama's HTTP API.
//!
//! # Architecture
//!
//! The [`OllamaProvider`] posts to `/api/generate` with streaming disabled,
//! temperature 0 and, when the request carries one, a JSON schema in the
//! `format` field so the model answers with structured output. It includes:
//!
//! - Availability detection via `/api/tags`
//! - Per-request timeouts
//! - Error classification into transport and parse failures
//!
//! # Example
//!
//! ```rust,ignore
//! use statecraft::llm::{CompletionRequest, LlmClient, OllamaProvider};
//!
//! let provider = OllamaProvider::new("llama3.2:3b", None)?;
//! if provider.available().await {
//!     let reply = provider.complete(&CompletionRequest::new("Hello!")).await?;
//!     println!("{reply}");
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::error::{Result, StatecraftError};
use crate::llm::{CompletionRequest, LlmClient};

// =============================================================================
// Ollama API Errors
// =============================================================================

/// Errors that can occur when communicating with the Ollama API.
#[derive(Debug, Error)]
pub enum OllamaApiError {
    /// Ollama server is not running or unreachable.
    #[error("Ollama server not available at '{host}': {message}")]
    ServerUnavailable {
        /// The host that was attempted.
        host: String,
        /// Error details.
        message: String,
    },

    /// The requested model is not installed.
    #[error("Model '{model}' is not installed. Run: ollama pull {model}")]
    ModelNotFound {
        /// The model that was requested.
        model: String,
    },

    /// Request timed out.
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration.
        timeout_secs: u64,
    },

    /// Invalid response from server.
    #[error("Invalid response from Ollama: {message}")]
    InvalidResponse {
        /// Error details.
        message: String,
    },
}

impl From<OllamaApiError> for StatecraftError {
    fn from(error: OllamaApiError) -> Self {
        match error {
            OllamaApiError::InvalidResponse { message } => {
                StatecraftError::parse("model response envelope", message)
            }
            other => StatecraftError::transport("model completion", other.to_string()),
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

// =============================================================================
// Ollama Provider
// =============================================================================

/// Ollama LLM provider for local inference.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    http: reqwest::Client,
    /// Model to use.
    model: String,
    /// Ollama server host URL.
    host: String,
    /// Request timeout in seconds.
    timeout_secs: u64,
}

impl OllamaProvider {
    /// Default Ollama server host.
    pub const DEFAULT_HOST: &'static str = "http://localhost:11434";

    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Create a new Ollama provider.
    ///
    /// # Arguments
    ///
    /// * `model` - Model name as known to Ollama (e.g. `llama3.2:3b`)
    /// * `host` - Optional custom host URL. Defaults to `http://localhost:11434`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(model: &str, host: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StatecraftError::config(format!("failed to create ollama client: {e}")))?;
        Ok(Self {
            http,
            model: model.to_string(),
            host: host
                .unwrap_or(Self::DEFAULT_HOST)
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs.max(1);
        self
    }

    /// Get the configured host URL.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Check if Ollama is running and the model has been pulled.
    pub async fn check_availability(&self) -> std::result::Result<bool, OllamaApiError> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.host))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            debug!("Ollama /api/tags returned HTTP {}", response.status());
            return Ok(false);
        }

        let tags: TagsResponse =
            response
                .json()
                .await
                .map_err(|e| OllamaApiError::InvalidResponse {
                    message: e.to_string(),
                })?;

        Ok(tags
            .models
            .iter()
            .any(|entry| self.matches_model(&entry.name)))
    }

    /// Check availability, treating any error as "not available".
    pub async fn available(&self) -> bool {
        self.check_availability().await.unwrap_or(false)
    }

    fn matches_model(&self, name: &str) -> bool {
        name == self.model
            || name.strip_suffix(":latest") == Some(self.model.as_str())
            || self.model.strip_suffix(":latest") == Some(name)
    }

    fn classify(&self, error: reqwest::Error) -> OllamaApiError {
        if error.is_timeout() {
            OllamaApiError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            OllamaApiError::ServerUnavailable {
                host: self.host.clone(),
                message: error.to_string(),
            }
        }
    }

    async fn generate(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<String, OllamaApiError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            format: request.response_format.as_ref(),
            options: request
                .temperature
                .map(|temperature| GenerateOptions { temperature }),
        };

        debug!(
            "Running Ollama {} ({} chars prompt)",
            self.model,
            request.prompt.len()
        );

        let response = self
            .http
            .post(format!("{}/api/generate", self.host))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(OllamaApiError::ModelNotFound {
                model: self.model.clone(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status.as_u16(), text.trim());
            return Err(if status.is_server_error() {
                OllamaApiError::ServerUnavailable {
                    host: self.host.clone(),
                    message,
                }
            } else {
                OllamaApiError::InvalidResponse { message }
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| OllamaApiError::InvalidResponse {
                    message: e.to_string(),
                })?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl LlmClient for OllamaProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        Ok(self.generate(request).await?)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// Tests
// =============================================================================
