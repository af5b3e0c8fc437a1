//! NationStates API access.
//!
//! The orchestrator talks to the game through two seams: [`IssueSource`] for
//! the pending-issue listing and [`Submitter`] for answering an issue. The
//! live implementation of both is [`NationStatesClient`]; [`DryRunSubmitter`]
//! stands in for the answer call when nothing should be sent.
//!
//! # Example
//!
//! ```rust,ignore
//! use statecraft::nationstates::{IssueSource, NationStatesClient};
//!
//! let client = NationStatesClient::new(
//!     NationStatesClient::DEFAULT_API_BASE,
//!     "Testlandia",
//!     "hunter2",
//!     "statecraft/0.1 (admin@example.com)",
//! )?;
//! for issue in client.list_pending_issues().await? {
//!     println!("#{} {}", issue.id, issue.title);
//! }
//! ```

pub mod client;
pub mod xml;

pub use client::NationStatesClient;
pub use xml::{parse_answer, parse_issues, AnswerReceipt};

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::issue::Issue;

/// Source of pending issues.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// List the issues currently awaiting an answer. May be empty.
    async fn list_pending_issues(&self) -> Result<Vec<Issue>>;
}

/// Sends a chosen option back to the game.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Answer `issue_id` with `option_id`.
    async fn submit(&self, issue_id: &str, option_id: &str) -> Result<SubmissionOutcome>;

    /// Whether submissions reach the network and must be paced.
    fn is_remote(&self) -> bool {
        true
    }
}

/// What happened when an answer was submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// Nothing was sent.
    pub dry_run: bool,
    /// Consequence text reported by the game.
    pub description: Option<String>,
}

impl SubmissionOutcome {
    /// Outcome of a live submission.
    #[must_use]
    pub fn live(description: Option<String>) -> Self {
        Self {
            dry_run: false,
            description,
        }
    }

    /// Outcome of a skipped submission.
    #[must_use]
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            description: None,
        }
    }
}

/// Submitter that sends nothing and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSubmitter;

#[async_trait]
impl Submitter for DryRunSubmitter {
    async fn submit(&self, issue_id: &str, option_id: &str) -> Result<SubmissionOutcome> {
        info!("[TEST] Would answer issue {issue_id} with option {option_id}");
        Ok(SubmissionOutcome::dry_run())
    }

    fn is_remote(&self) -> bool {
        false
    }
}

/// Canonical form of a nation name as the API expects it.
///
/// ```
/// use statecraft::nationstates::normalize_nation_name;
///
/// assert_eq!(normalize_nation_name("  The Grand Duchy "), "the_grand_duchy");
/// ```
#[must_use]
pub fn normalize_nation_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_submitter_succeeds_without_network() {
        let submitter = DryRunSubmitter;
        let outcome = submitter.submit("42", "2").await.unwrap();
        assert!(outcome.dry_run);
        assert_eq!(outcome.description, None);
        assert!(!submitter.is_remote());
    }

    #[test]
    fn test_normalize_nation_name() {
        assert_eq!(normalize_nation_name("Testlandia"), "testlandia");
        assert_eq!(normalize_nation_name("New Example"), "new_example");
        assert_eq!(normalize_nation_name("already_ok"), "already_ok");
    }

    #[test]
    fn test_submitters_are_object_safe() {
        let submitter: Box<dyn Submitter> = Box::new(DryRunSubmitter);
        assert!(!submitter.is_remote());
    }
}
