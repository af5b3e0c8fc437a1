//! Run configuration for Statecraft.
//!
//! Configuration is resolved once at startup into a [`BotConfig`] and handed
//! to component constructors; nothing reads the environment after that.

pub mod resolution;

pub use resolution::{ConfigLayer, DEFAULT_CONFIG_FILE};

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::decision::retry::{DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CEILING};
use crate::decision::{BackoffPolicy, EngineConfig};
use crate::decision_log::DEFAULT_LOG_FILE;
use crate::error::{Result, StatecraftError};
use crate::llm::OllamaProvider;
use crate::nationstates::NationStatesClient;
use crate::orchestrator::OrchestratorSettings;
use crate::prompt::OptionFormatter;

/// Default seconds between NationStates requests.
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 10;
/// Default Ollama model.
pub const DEFAULT_MODEL: &str = "llama3.2:3b";
/// Default model calls per issue.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default seconds between cycles in continuous mode.
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// A credential that never appears in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for the one place that must send it.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Fully resolved settings for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    /// Nation name as given; the client normalises it.
    pub nation: String,
    /// Nation password, sent as `X-Password`.
    pub password: Secret,
    /// Contact string NationStates requires in `User-Agent`.
    pub user_agent: String,
    /// Minimum gap between NationStates calls.
    pub request_delay: Duration,
    /// Decide and log without submitting.
    pub dry_run: bool,
    /// Stop after one cycle.
    pub single_run: bool,
    /// Ollama model name.
    pub model: String,
    /// Model calls per issue before the random fallback.
    pub max_retries: u32,
    /// Ask for and record the model's reasoning.
    pub log_reasoning: bool,
    /// Ollama server URL.
    pub ollama_host: String,
    /// Bound on a single model call.
    pub model_timeout: Duration,
    /// First backoff delay.
    pub backoff_base: Duration,
    /// Largest backoff delay.
    pub backoff_ceiling: Duration,
    /// Sleep between cycles in continuous mode.
    pub cycle_interval: Duration,
    /// Longest option text shown to the model, in characters.
    pub max_option_chars: usize,
    /// Decision log path.
    pub log_file: PathBuf,
    /// NationStates API endpoint.
    pub api_base: String,
}

impl BotConfig {
    /// Apply defaults to a merged layer and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an invalid-configuration error for the first rule violated.
    pub fn from_layer(layer: ConfigLayer) -> Result<Self> {
        let config = Self {
            nation: layer.nation.unwrap_or_default().trim().to_string(),
            password: Secret::new(layer.password.unwrap_or_default()),
            user_agent: layer.user_agent.unwrap_or_default().trim().to_string(),
            request_delay: Duration::from_secs(
                layer
                    .request_delay_secs
                    .unwrap_or(DEFAULT_REQUEST_DELAY_SECS),
            ),
            dry_run: layer.dry_run.unwrap_or(false),
            single_run: layer.single_run.unwrap_or(false),
            model: layer.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_retries: layer.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            log_reasoning: layer.log_reasoning.unwrap_or(false),
            ollama_host: layer
                .ollama_host
                .unwrap_or_else(|| OllamaProvider::DEFAULT_HOST.to_string()),
            model_timeout: Duration::from_secs(
                layer
                    .model_timeout_secs
                    .unwrap_or(OllamaProvider::DEFAULT_TIMEOUT_SECS),
            ),
            backoff_base: layer
                .backoff_base_secs
                .map_or(DEFAULT_BACKOFF_BASE, Duration::from_secs),
            backoff_ceiling: layer
                .backoff_ceiling_secs
                .map_or(DEFAULT_BACKOFF_CEILING, Duration::from_secs),
            cycle_interval: Duration::from_secs(
                layer
                    .cycle_interval_secs
                    .unwrap_or(DEFAULT_CYCLE_INTERVAL_SECS),
            ),
            max_option_chars: layer
                .max_option_chars
                .unwrap_or(OptionFormatter::DEFAULT_MAX_OPTION_CHARS),
            log_file: layer
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            api_base: layer
                .api_base
                .unwrap_or_else(|| NationStatesClient::DEFAULT_API_BASE.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the rules every run depends on.
    ///
    /// # Errors
    ///
    /// Returns an invalid-configuration error naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.nation.is_empty() {
            return Err(StatecraftError::invalid_config(
                "nation",
                "must be set (--nation or NATION)",
            ));
        }
        if self.password.is_blank() {
            return Err(StatecraftError::invalid_config(
                "password",
                "must be set (--password or PASSWORD)",
            ));
        }
        if self.user_agent.is_empty() {
            return Err(StatecraftError::invalid_config(
                "user_agent",
                "must be set (--user-agent or USER_AGENT); NationStates requires a contact",
            ));
        }
        if self.max_retries == 0 {
            return Err(StatecraftError::invalid_config(
                "max_retries",
                "must be at least 1",
            ));
        }
        if self.backoff_base > self.backoff_ceiling {
            return Err(StatecraftError::invalid_config(
                "backoff_base_secs",
                format!(
                    "{}s exceeds the ceiling of {}s",
                    self.backoff_base.as_secs(),
                    self.backoff_ceiling.as_secs()
                ),
            ));
        }
        if self.max_option_chars == 0 {
            return Err(StatecraftError::invalid_config(
                "max_option_chars",
                "must be at least 1",
            ));
        }
        if self.model.trim().is_empty() {
            return Err(StatecraftError::invalid_config("model", "must not be empty"));
        }
        Ok(())
    }

    /// Backoff policy shared by the engine and listing retries.
    #[must_use]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.backoff_base, self.backoff_ceiling)
    }

    /// Settings for the decision engine.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_retries: self.max_retries,
            model_timeout: self.model_timeout,
            backoff: self.backoff(),
            log_reasoning: self.log_reasoning,
        }
    }

    /// Formatter matching this configuration.
    #[must_use]
    pub fn formatter(&self) -> OptionFormatter {
        OptionFormatter::new()
            .with_max_option_chars(self.max_option_chars)
            .with_reasoning(self.log_reasoning)
    }

    /// Settings for the orchestrator loop.
    #[must_use]
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            request_delay: self.request_delay,
            cycle_interval: self.cycle_interval,
            single_run: self.single_run,
            listing_retries: self.max_retries,
            backoff: self.backoff(),
            max_cycles: None,
        }
    }
}
