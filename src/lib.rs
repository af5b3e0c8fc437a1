//! Statecraft - NationStates issue autopilot
//!
//! Answers a nation's pending NationStates issues with a local language model
//! served by Ollama, falling back to a uniform random option whenever the
//! model cannot produce a usable answer, and records every choice in an
//! append-only log.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`] - Layered configuration (file, environment, flags) and validation
//! - [`decision`] - Model decisions with retry, strict parsing and random fallback
//! - [`decision_log`] - Append-only NDJSON decision log
//! - [`error`] - Custom error types and handling
//! - [`issue`] - Issues and their options
//! - [`llm`] - Language model client abstraction and the Ollama provider
//! - [`nationstates`] - Issue listing and answer submission
//! - [`orchestrator`] - The fetch, decide, submit, log cycle
//! - [`prompt`] - Canonical prompt formatting
//! - [`testing`] - Testing infrastructure (mocks, fixtures, assertions)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use statecraft::{BotConfig, DecisionEngine, DecisionLog, DryRunSubmitter, Orchestrator};
//! use statecraft::llm::OllamaProvider;
//! use statecraft::nationstates::NationStatesClient;
//!
//! let client = Arc::new(NationStatesClient::new(
//!     &config.api_base,
//!     &config.nation,
//!     config.password.expose(),
//!     &config.user_agent,
//! )?);
//! let llm = Arc::new(OllamaProvider::new(&config.model, Some(&config.ollama_host))?);
//!
//! let mut orchestrator = Orchestrator::new(
//!     client,
//!     Arc::new(DryRunSubmitter),
//!     config.formatter(),
//!     DecisionEngine::new(llm, config.engine_config()),
//!     DecisionLog::new(&config.log_file),
//!     config.orchestrator_settings(),
//! );
//! let report = orchestrator.run_cycle().await?;
//! println!("{} resolved, {} failed", report.resolved(), report.failed());
//! ```

pub mod config;
pub mod decision;
pub mod decision_log;
pub mod error;
pub mod issue;
pub mod llm;
pub mod nationstates;
pub mod orchestrator;
pub mod prompt;
pub mod testing;

// Re-export commonly used types
pub use error::{Result, StatecraftError};

// Re-export config types
pub use config::{BotConfig, ConfigLayer, Secret};

// Re-export pipeline types
pub use decision::{Decision, DecisionEngine, EngineConfig, SelectionMethod};
pub use decision_log::{DecisionLog, LogScan, LogStats};
pub use issue::{Issue, IssueOption};
pub use nationstates::{DryRunSubmitter, IssueSource, SubmissionOutcome, Submitter};
pub use orchestrator::{CycleReport, Orchestrator, OrchestratorSettings, RunSummary};
pub use prompt::{OptionFormatter, PromptPayload};
