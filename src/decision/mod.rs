//! Decision making for pending issues.
//!
//! - [`engine`] - Model invocation with retry, validation and random fallback
//! - [`parser`] - Strict parsing of untrusted model output
//! - [`retry`] - Backoff policy and per-issue retry bookkeeping
//!
//! # Architecture
//!
//! ```text
//! PromptPayload ──complete──> raw reply ──parse──> ParsedAnswer ──validate──> Decision (AI)
//!       │                        │                     │
//!       │                   transport err          parse/validation err
//!       │                        └──────────┬──────────┘
//!       │                                   ▼
//!       │                          RetryState + backoff
//!       │                                   │ exhausted
//!       └────────── uniform choice ─────────┴──────────> Decision (RANDOM)
//! ```

pub mod engine;
pub mod parser;
pub mod retry;

pub use engine::{DecisionEngine, EngineConfig, Resolution};
pub use parser::{parse_model_response, validate_choice, ParsedAnswer};
pub use retry::{AttemptFailure, BackoffPolicy, RetryState};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatecraftError};
use crate::issue::Issue;
use crate::prompt::PromptPayload;

/// How the chosen option was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// The language model chose a valid option.
    #[serde(rename = "AI")]
    Ai,
    /// Uniform random fallback after the model failed.
    #[serde(rename = "RANDOM", alias = "random")]
    Random,
}

impl std::fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ai => write!(f, "AI"),
            Self::Random => write!(f, "RANDOM"),
        }
    }
}

/// The recorded outcome of resolving one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Issue identifier.
    pub issue_id: String,
    /// Issue title.
    pub title: String,
    /// Descriptive text of the issue.
    #[serde(default)]
    pub text: String,
    /// Chosen option identifier.
    pub option_id: String,
    /// Text of the chosen option.
    #[serde(default)]
    pub chosen_option_text: String,
    /// Selection method.
    pub method: SelectionMethod,
    /// Model justification, when requested and available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Decision {
    /// Build a decision, checking the chosen option against the option set
    /// captured when the prompt was formatted.
    ///
    /// Random decisions never carry reasoning.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `option_id` is not one of the payload's
    /// option identifiers.
    pub fn new(
        issue: &Issue,
        payload: &PromptPayload,
        option_id: &str,
        method: SelectionMethod,
        reasoning: Option<String>,
    ) -> Result<Self> {
        if !payload.contains_option(option_id) {
            return Err(StatecraftError::validation(format!(
                "option {option_id} is not offered by issue {}",
                payload.issue_id()
            )));
        }

        let reasoning = match method {
            SelectionMethod::Ai => reasoning,
            SelectionMethod::Random => None,
        };

        Ok(Self {
            timestamp: unix_timestamp(),
            issue_id: issue.id.clone(),
            title: issue.title.clone(),
            text: issue.text.clone(),
            option_id: option_id.to_string(),
            chosen_option_text: issue
                .option(option_id)
                .map(|option| option.text.clone())
                .unwrap_or_default(),
            method,
            reasoning,
        })
    }
}

fn unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
