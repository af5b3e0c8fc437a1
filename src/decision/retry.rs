//! Backoff policy and retry bookkeeping.
//!
//! The delay before retry `k` (0-indexed) is `base × 2^k`, capped at the
//! ceiling, so the schedule is non-decreasing and the total wait for a given
//! configuration is fixed.

use std::time::Duration;

use crate::error::StatecraftError;

/// Default base backoff delay.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Default maximum backoff delay.
pub const DEFAULT_BACKOFF_CEILING: Duration = Duration::from_secs(30);

/// Multiplier for exponential backoff.
pub const BACKOFF_MULTIPLIER: u32 = 2;

/// Exponential backoff with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    ceiling: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CEILING)
    }
}

impl BackoffPolicy {
    /// Create a policy. A ceiling below the base is raised to the base.
    #[must_use]
    pub fn new(base: Duration, ceiling: Duration) -> Self {
        Self {
            base,
            ceiling: ceiling.max(base),
        }
    }

    /// Policy that never waits.
    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Base delay.
    #[must_use]
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Maximum delay.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Delay before retry number `retry` (0 = first retry).
    ///
    /// # Example
    ///
    /// ```
    /// use statecraft::decision::BackoffPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(5));
    /// assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    /// assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    /// assert_eq!(policy.delay_for(3), Duration::from_secs(5));
    /// ```
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let multiplier = BACKOFF_MULTIPLIER.saturating_pow(retry);
        self.base.saturating_mul(multiplier).min(self.ceiling)
    }

    /// Delays slept between `max_attempts` attempts.
    #[must_use]
    pub fn schedule(&self, max_attempts: u32) -> Vec<Duration> {
        (0..max_attempts.saturating_sub(1))
            .map(|retry| self.delay_for(retry))
            .collect()
    }

    /// Total time spent waiting when every one of `max_attempts` fails.
    #[must_use]
    pub fn total_for(&self, max_attempts: u32) -> Duration {
        self.schedule(max_attempts).into_iter().sum()
    }
}

/// One failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// 1-indexed attempt number.
    pub attempt: u32,
    /// Error kind label.
    pub kind: &'static str,
    /// Error message.
    pub message: String,
}

/// Per-issue retry bookkeeping. Discarded once the issue is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    max_attempts: u32,
    attempts: u32,
    failures: Vec<AttemptFailure>,
    delays: Vec<Duration>,
}

impl RetryState {
    /// Create state allowing `max_attempts` attempts (at least one).
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempts: 0,
            failures: Vec::new(),
            delays: Vec::new(),
        }
    }

    /// Whether another attempt is allowed.
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Start an attempt and return its 1-indexed number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// Record the failure of the current attempt.
    pub fn record_failure(&mut self, error: &StatecraftError) {
        self.failures.push(AttemptFailure {
            attempt: self.attempts,
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    /// Record a backoff delay that was slept.
    pub fn record_delay(&mut self, delay: Duration) {
        self.delays.push(delay);
    }

    /// Attempts made so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Attempt limit.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// All recorded failures, oldest first.
    #[must_use]
    pub fn failures(&self) -> &[AttemptFailure] {
        &self.failures
    }

    /// The most recent failure.
    #[must_use]
    pub fn last_error(&self) -> Option<&AttemptFailure> {
        self.failures.last()
    }

    /// Backoff delays slept so far.
    #[must_use]
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}
