//! Layered configuration resolution.
//!
//! Settings arrive from three places with increasing priority:
//!
//! 1. **Defaults** - Built into [`BotConfig`](super::BotConfig)
//! 2. **File** - An optional TOML file (`statecraft.toml` unless `--config`
//!    names another)
//! 3. **Command line** - Flags, with environment variables as their fallback
//!
//! Each source is read into a [`ConfigLayer`] of optional values; layers are
//! merged field by field so a higher layer only overrides what it sets.
//!
//! # Example
//!
//! ```toml
//! nation = "testlandia"
//! user_agent = "statecraft/0.1 (admin@example.com)"
//! model = "llama3.2:3b"
//! max_retries = 5
//! log_file = "logs/choices.ndjson"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, StatecraftError};

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "statecraft.toml";

/// One source of settings. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub nation: Option<String>,
    pub password: Option<String>,
    pub user_agent: Option<String>,
    pub request_delay_secs: Option<u64>,
    pub dry_run: Option<bool>,
    pub single_run: Option<bool>,
    pub model: Option<String>,
    pub max_retries: Option<u32>,
    pub log_reasoning: Option<bool>,
    pub ollama_host: Option<String>,
    pub model_timeout_secs: Option<u64>,
    pub backoff_base_secs: Option<u64>,
    pub backoff_ceiling_secs: Option<u64>,
    pub cycle_interval_secs: Option<u64>,
    pub max_option_chars: Option<usize>,
    pub log_file: Option<PathBuf>,
    pub api_base: Option<String>,
}

impl ConfigLayer {
    /// Read a layer from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the path if the file cannot be
    /// read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StatecraftError::config_with_path(format!("failed to read: {e}"), path.to_path_buf())
        })?;
        let layer: Self = toml::from_str(&contents).map_err(|e| {
            StatecraftError::config_with_path(format!("failed to parse: {e}"), path.to_path_buf())
        })?;
        debug!("Loaded config file {}", path.display());
        Ok(layer)
    }

    /// Find and read the config file layer.
    ///
    /// An explicitly named file must exist. Without one, the default file in
    /// `dir` is used when present and an empty layer otherwise.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the chosen file cannot be loaded.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = dir.join(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Overlay `self` on `lower`: every field set here wins.
    #[must_use]
    pub fn merge(self, lower: Self) -> Self {
        Self {
            nation: self.nation.or(lower.nation),
            password: self.password.or(lower.password),
            user_agent: self.user_agent.or(lower.user_agent),
            request_delay_secs: self.request_delay_secs.or(lower.request_delay_secs),
            dry_run: self.dry_run.or(lower.dry_run),
            single_run: self.single_run.or(lower.single_run),
            model: self.model.or(lower.model),
            max_retries: self.max_retries.or(lower.max_retries),
            log_reasoning: self.log_reasoning.or(lower.log_reasoning),
            ollama_host: self.ollama_host.or(lower.ollama_host),
            model_timeout_secs: self.model_timeout_secs.or(lower.model_timeout_secs),
            backoff_base_secs: self.backoff_base_secs.or(lower.backoff_base_secs),
            backoff_ceiling_secs: self.backoff_ceiling_secs.or(lower.backoff_ceiling_secs),
            cycle_interval_secs: self.cycle_interval_secs.or(lower.cycle_interval_secs),
            max_option_chars: self.max_option_chars.or(lower.max_option_chars),
            log_file: self.log_file.or(lower.log_file),
            api_base: self.api_base.or(lower.api_base),
        }
    }
}
