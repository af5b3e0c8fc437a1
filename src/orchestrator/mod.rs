//! The issue-answering cycle.
//!
//! # Architecture
//!
//! The [`Orchestrator`] owns one instance of every stage and drives them in a
//! fixed order for each cycle:
//!
//! 1. **Fetch** - List pending issues (paced, retried on transport failure)
//! 2. **Format** - Build the prompt payload for one issue
//! 3. **Decide** - Ask the model, falling back to a random option
//! 4. **Submit** - Send the answer, or skip it in dry-run mode (paced when live)
//! 5. **Log** - Append the decision to the log
//!
//! Issues are handled strictly one after another. A failure on one issue is
//! recorded in the [`CycleReport`] and the cycle moves on; only a listing
//! failure or rejected credentials end it early.
//!
//! # Dependency Injection
//!
//! Remote collaborators are passed in as trait objects so the whole cycle can
//! run against the mocks in [`crate::testing`].

pub mod pacer;

pub use pacer::RequestPacer;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::decision::{BackoffPolicy, Decision, DecisionEngine, RetryState, SelectionMethod};
use crate::decision_log::DecisionLog;
use crate::error::{Result, StatecraftError};
use crate::issue::Issue;
use crate::nationstates::{IssueSource, Submitter};
use crate::prompt::OptionFormatter;

/// Loop-level settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Minimum gap between remote NationStates calls.
    pub request_delay: Duration,
    /// Sleep between cycles in continuous mode.
    pub cycle_interval: Duration,
    /// Stop after one cycle.
    pub single_run: bool,
    /// Listing attempts per cycle.
    pub listing_retries: u32,
    /// Delay schedule between listing attempts.
    pub backoff: BackoffPolicy,
    /// Stop after this many cycles even in continuous mode.
    pub max_cycles: Option<u32>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_secs(crate::config::DEFAULT_REQUEST_DELAY_SECS),
            cycle_interval: Duration::from_secs(crate::config::DEFAULT_CYCLE_INTERVAL_SECS),
            single_run: false,
            listing_retries: crate::config::DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::default(),
            max_cycles: None,
        }
    }
}

/// Pipeline stage at which an issue failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStage {
    Format,
    Decide,
    Submit,
    Log,
}

impl fmt::Display for IssueStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format => write!(f, "format"),
            Self::Decide => write!(f, "decide"),
            Self::Submit => write!(f, "submit"),
            Self::Log => write!(f, "log"),
        }
    }
}

/// One issue that could not be resolved this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFailure {
    /// Issue that was skipped.
    pub issue_id: String,
    /// Stage that failed.
    pub stage: IssueStage,
    /// Error kind label.
    pub kind: &'static str,
    /// Model calls made before the failure.
    pub attempts: u32,
    /// Rendered error.
    pub message: String,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Identifier attached to the cycle's tracing span.
    pub cycle_id: Uuid,
    /// Answers were not sent to NationStates.
    pub dry_run: bool,
    /// Issues returned by the listing.
    pub fetched: usize,
    /// Decisions submitted (or skipped in dry-run) and logged.
    pub decisions: Vec<Decision>,
    /// Issues skipped this cycle.
    pub failures: Vec<IssueFailure>,
}

impl CycleReport {
    fn new(cycle_id: Uuid, dry_run: bool) -> Self {
        Self {
            cycle_id,
            dry_run,
            fetched: 0,
            decisions: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Issues fully resolved.
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.decisions.len()
    }

    /// Issues that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Decisions made by the model.
    #[must_use]
    pub fn ai(&self) -> usize {
        self.count(SelectionMethod::Ai)
    }

    /// Decisions made by the random fallback.
    #[must_use]
    pub fn random(&self) -> usize {
        self.count(SelectionMethod::Random)
    }

    fn count(&self, method: SelectionMethod) -> usize {
        self.decisions.iter().filter(|d| d.method == method).count()
    }
}

/// Totals across every cycle of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles started.
    pub cycles: u32,
    /// Cycles that ended in a non-fatal error.
    pub failed_cycles: u32,
    /// Issues resolved across all cycles.
    pub resolved: usize,
    /// Issues skipped across all cycles.
    pub failed: usize,
}

/// Drives fetch, decide, submit and log for every pending issue.
pub struct Orchestrator {
    source: Arc<dyn IssueSource>,
    submitter: Arc<dyn Submitter>,
    formatter: OptionFormatter,
    engine: DecisionEngine,
    log: DecisionLog,
    settings: OrchestratorSettings,
    pacer: RequestPacer,
}

impl Orchestrator {
    /// Assemble an orchestrator from its stages.
    pub fn new(
        source: Arc<dyn IssueSource>,
        submitter: Arc<dyn Submitter>,
        formatter: OptionFormatter,
        engine: DecisionEngine,
        log: DecisionLog,
        settings: OrchestratorSettings,
    ) -> Self {
        let pacer = RequestPacer::new(settings.request_delay);
        Self {
            source,
            submitter,
            formatter,
            engine,
            log,
            settings,
            pacer,
        }
    }

    /// Loop-level settings.
    #[must_use]
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run one cycle over every pending issue.
    ///
    /// # Errors
    ///
    /// Returns the listing error if issues could not be fetched, or an
    /// authentication error from a submission. Other per-issue failures are
    /// reported in the returned [`CycleReport`].
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", %cycle_id);
        self.cycle(cycle_id).instrument(span).await
    }

    /// Run cycles until single-run mode, the cycle limit, or Ctrl-C stops
    /// the loop. `on_cycle` sees every completed cycle.
    ///
    /// # Errors
    ///
    /// Returns authentication errors immediately. In single-run mode any
    /// cycle error is returned; in continuous mode other errors are logged
    /// and the next cycle runs as scheduled.
    pub async fn run<F>(&mut self, mut on_cycle: F) -> Result<RunSummary>
    where
        F: FnMut(&CycleReport),
    {
        let mut summary = RunSummary::default();
        loop {
            summary.cycles += 1;
            match self.run_cycle().await {
                Ok(report) => {
                    summary.resolved += report.resolved();
                    summary.failed += report.failed();
                    on_cycle(&report);
                }
                Err(e) if e.is_fatal() || self.settings.single_run => return Err(e),
                Err(e) => {
                    summary.failed_cycles += 1;
                    error!("Cycle failed ({}): {}", e.kind(), e);
                }
            }

            if self.settings.single_run {
                break;
            }
            if self
                .settings
                .max_cycles
                .is_some_and(|limit| summary.cycles >= limit)
            {
                break;
            }

            info!(
                "Next cycle in {}s",
                self.settings.cycle_interval.as_secs()
            );
            tokio::select! {
                () = tokio::time::sleep(self.settings.cycle_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping after {} cycle(s)", summary.cycles);
                    break;
                }
            }
        }
        Ok(summary)
    }

    async fn cycle(&mut self, cycle_id: Uuid) -> Result<CycleReport> {
        let mut report = CycleReport::new(cycle_id, !self.submitter.is_remote());

        let issues = self.fetch_issues().await?;
        report.fetched = issues.len();
        info!("Found {} pending issue(s)", issues.len());

        for issue in &issues {
            if let Some(failure) = self.process_issue(issue, &mut report).await? {
                error!(
                    issue_id = %failure.issue_id,
                    stage = %failure.stage,
                    kind = failure.kind,
                    attempts = failure.attempts,
                    "Skipping issue: {}",
                    failure.message
                );
                report.failures.push(failure);
            }
        }

        info!(
            resolved = report.resolved(),
            failed = report.failed(),
            ai = report.ai(),
            random = report.random(),
            "Cycle complete"
        );
        Ok(report)
    }

    async fn fetch_issues(&mut self) -> Result<Vec<Issue>> {
        let mut retry = RetryState::new(self.settings.listing_retries);
        loop {
            let attempt = retry.begin_attempt();
            self.pacer.ready().await;
            let result = self.source.list_pending_issues().await;
            self.pacer.mark();

            match result {
                Ok(issues) => return Ok(issues),
                Err(e) if e.is_retryable() && retry.has_remaining() => {
                    let delay = self.settings.backoff.delay_for(attempt - 1);
                    warn!(
                        "Listing attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        retry.max_attempts(),
                        e,
                        delay
                    );
                    retry.record_failure(&e);
                    retry.record_delay(delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Resolve one issue. `Ok(Some(_))` is a per-issue failure; `Err` ends
    /// the cycle.
    async fn process_issue(
        &mut self,
        issue: &Issue,
        report: &mut CycleReport,
    ) -> Result<Option<IssueFailure>> {
        let failure = |stage, attempts, e: &StatecraftError| IssueFailure {
            issue_id: issue.id.clone(),
            stage,
            kind: e.kind(),
            attempts,
            message: e.to_string(),
        };

        let payload = match self.formatter.format(issue) {
            Ok(payload) => payload,
            Err(e) => return Ok(Some(failure(IssueStage::Format, 0, &e))),
        };
        if !payload.truncated().is_empty() {
            warn!(
                issue_id = %issue.id,
                "Truncated option text for option(s) {}",
                payload.truncated().join(", ")
            );
        }

        let resolution = match self.engine.resolve(issue, &payload).await {
            Ok(resolution) => resolution,
            Err(e) => return Ok(Some(failure(IssueStage::Decide, 0, &e))),
        };
        let attempts = resolution.retry.attempts();
        let decision = resolution.decision;

        let remote = self.submitter.is_remote();
        if remote {
            self.pacer.ready().await;
        }
        let submitted = self
            .submitter
            .submit(&decision.issue_id, &decision.option_id)
            .await;
        if remote {
            self.pacer.mark();
        }

        match submitted {
            Ok(outcome) => {
                if let Some(description) = outcome.description {
                    info!(issue_id = %decision.issue_id, "Consequence: {description}");
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => return Ok(Some(failure(IssueStage::Submit, attempts, &e))),
        }

        if let Err(e) = self.log.append(&decision) {
            return Ok(Some(failure(IssueStage::Log, attempts, &e)));
        }

        info!(
            issue_id = %decision.issue_id,
            option_id = %decision.option_id,
            method = %decision.method,
            attempts,
            "Resolved \"{}\"",
            decision.title
        );
        report.decisions.push(decision);
        Ok(None)
    }
}
