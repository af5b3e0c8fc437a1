//! Mock implementations of the NationStates seams.
//!
//! These mocks provide controllable test doubles for the issue listing and
//! answer calls, enabling deterministic pipeline tests. Every call is recorded
//! with its (possibly paused) tokio instant so request spacing can be checked.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{Result, StatecraftError};
use crate::issue::Issue;
use crate::nationstates::{IssueSource, SubmissionOutcome, Submitter};

/// Failure a mock can be told to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Network-level failure (retryable).
    Transport(String),
    /// Credentials rejected with the given HTTP status.
    Auth(u16),
    /// Undecodable response.
    Parse(String),
}

impl MockFailure {
    fn to_error(&self, operation: &str) -> StatecraftError {
        match self {
            Self::Transport(message) => StatecraftError::transport(operation, message.clone()),
            Self::Auth(status) => StatecraftError::auth(operation, *status),
            Self::Parse(message) => StatecraftError::parse(operation, message.clone()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Mock issue listing.
///
/// Scripted replies are consumed in order; once the script is empty every
/// call returns the fallback listing (no issues by default).
///
/// # Example
///
/// ```rust
/// use statecraft::nationstates::IssueSource;
/// use statecraft::testing::{tax_issue, MockFailure, MockIssueSource};
///
/// # #[tokio::main]
/// # async fn main() {
/// let source = MockIssueSource::new()
///     .with_failure(MockFailure::Transport("reset".into()))
///     .with_issues(vec![tax_issue()]);
///
/// assert!(source.list_pending_issues().await.is_err());
/// assert_eq!(source.list_pending_issues().await.unwrap().len(), 1);
/// assert!(source.list_pending_issues().await.unwrap().is_empty());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockIssueSource {
    script: Mutex<VecDeque<std::result::Result<Vec<Issue>, MockFailure>>>,
    fallback: Vec<Issue>,
    call_count: AtomicU32,
    calls_at: Mutex<Vec<Instant>>,
}

impl MockIssueSource {
    /// Create a source that always lists no issues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source that always lists `issues`.
    #[must_use]
    pub fn listing(issues: Vec<Issue>) -> Self {
        Self {
            fallback: issues,
            ..Self::default()
        }
    }

    /// Queue a successful listing.
    #[must_use]
    pub fn with_issues(self, issues: Vec<Issue>) -> Self {
        lock(&self.script).push_back(Ok(issues));
        self
    }

    /// Queue a failed listing.
    #[must_use]
    pub fn with_failure(self, failure: MockFailure) -> Self {
        lock(&self.script).push_back(Err(failure));
        self
    }

    /// Number of listing calls made.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Instants at which listing calls were made.
    #[must_use]
    pub fn calls_at(&self) -> Vec<Instant> {
        lock(&self.calls_at).clone()
    }
}

#[async_trait]
impl IssueSource for MockIssueSource {
    async fn list_pending_issues(&self) -> Result<Vec<Issue>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.calls_at).push(Instant::now());

        let next = lock(&self.script).pop_front();
        match next {
            Some(Ok(issues)) => Ok(issues),
            Some(Err(failure)) => Err(failure.to_error("list issues")),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Mock answer endpoint that records every submission.
#[derive(Debug)]
pub struct MockSubmitter {
    remote: bool,
    description: Option<String>,
    failures: HashMap<String, MockFailure>,
    submissions: Mutex<Vec<(String, String)>>,
    calls_at: Mutex<Vec<Instant>>,
}

impl Default for MockSubmitter {
    fn default() -> Self {
        Self {
            remote: true,
            description: None,
            failures: HashMap::new(),
            submissions: Mutex::new(Vec::new()),
            calls_at: Mutex::new(Vec::new()),
        }
    }
}

impl MockSubmitter {
    /// Create a remote submitter that accepts every answer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a consequence description on success.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Fail every submission for `issue_id`.
    #[must_use]
    pub fn failing_on(mut self, issue_id: &str, failure: MockFailure) -> Self {
        self.failures.insert(issue_id.to_string(), failure);
        self
    }

    /// Mark the submitter as local, so calls are not paced.
    #[must_use]
    pub fn local(mut self) -> Self {
        self.remote = false;
        self
    }

    /// `(issue_id, option_id)` pairs submitted so far, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<(String, String)> {
        lock(&self.submissions).clone()
    }

    /// Instants at which submissions were attempted.
    #[must_use]
    pub fn calls_at(&self) -> Vec<Instant> {
        lock(&self.calls_at).clone()
    }
}

#[async_trait]
impl Submitter for MockSubmitter {
    async fn submit(&self, issue_id: &str, option_id: &str) -> Result<SubmissionOutcome> {
        lock(&self.calls_at).push(Instant::now());
        if let Some(failure) = self.failures.get(issue_id) {
            return Err(failure.to_error("answer issue"));
        }
        let submission = (issue_id.to_string(), option_id.to_string());
        lock(&self.submissions).push(submission);
        Ok(SubmissionOutcome::live(self.description.clone()))
    }

    fn is_remote(&self) -> bool {
        self.remote
    }
}
