//! The decision engine.
//!
//! Sends a formatted issue to the model, retries transport failures and
//! unusable answers against one shared budget, and falls back to a uniform
//! random option once the budget is spent. The engine never submits or logs.
//!
//! Every retry re-sends the identical prompt, so a scripted model produces the
//! same AI/RANDOM split on every run.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::parser::{parse_model_response, validate_choice};
use super::retry::{BackoffPolicy, RetryState};
use super::{Decision, SelectionMethod};
use crate::error::{Result, StatecraftError};
use crate::issue::Issue;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompt::PromptPayload;

/// Engine settings, captured once from the run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Total model calls allowed per issue.
    pub max_retries: u32,
    /// Upper bound on a single model call.
    pub model_timeout: Duration,
    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,
    /// Keep the model's reasoning in the decision.
    pub log_reasoning: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            model_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
            log_reasoning: false,
        }
    }
}

/// A decision together with the retry history that produced it.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The decision.
    pub decision: Decision,
    /// Attempts, failures and delays.
    pub retry: RetryState,
}

/// Chooses an option for each issue.
pub struct DecisionEngine {
    client: Arc<dyn LlmClient>,
    config: EngineConfig,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("model", &self.client.model_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DecisionEngine {
    /// Create an engine with an entropy-seeded fallback generator.
    pub fn new(client: Arc<dyn LlmClient>, config: EngineConfig) -> Self {
        Self {
            client,
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seed the fallback generator for reproducible runs.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Engine settings.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decide an issue.
    ///
    /// # Errors
    ///
    /// Fails only if the payload offers no options; model failures end in a
    /// random decision instead.
    pub async fn decide(&self, issue: &Issue, payload: &PromptPayload) -> Result<Decision> {
        self.resolve(issue, payload)
            .await
            .map(|resolution| resolution.decision)
    }

    /// Decide an issue and return the retry history as well.
    ///
    /// # Errors
    ///
    /// Fails only if the payload offers no options.
    pub async fn resolve(&self, issue: &Issue, payload: &PromptPayload) -> Result<Resolution> {
        if payload.option_ids().is_empty() {
            return Err(StatecraftError::validation(format!(
                "issue {} offers no options to choose from",
                payload.issue_id()
            )));
        }

        let request = CompletionRequest::new(payload.text())
            .with_response_format(payload.response_schema().clone())
            .with_temperature(0.0);
        let mut state = RetryState::new(self.config.max_retries);

        while state.has_remaining() {
            let attempt = state.begin_attempt();
            match self.attempt(&request, payload).await {
                Ok((option_id, reasoning)) => {
                    let reasoning = if self.config.log_reasoning {
                        reasoning
                    } else {
                        None
                    };
                    let decision =
                        Decision::new(issue, payload, &option_id, SelectionMethod::Ai, reasoning)?;
                    info!(
                        issue_id = %issue.id,
                        option_id = %decision.option_id,
                        attempt,
                        "Model chose option"
                    );
                    return Ok(Resolution {
                        decision,
                        retry: state,
                    });
                }
                Err(error) => {
                    warn!(
                        issue_id = %issue.id,
                        attempt,
                        max_attempts = state.max_attempts(),
                        kind = error.kind(),
                        "Model attempt failed: {}",
                        error
                    );
                    state.record_failure(&error);
                    if state.has_remaining() {
                        let delay = self.config.backoff.delay_for(attempt - 1);
                        debug!("Backing off {:?} before next model attempt", delay);
                        state.record_delay(delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let option_id = self.pick_random(payload)?;
        let decision = Decision::new(issue, payload, &option_id, SelectionMethod::Random, None)?;
        warn!(
            issue_id = %issue.id,
            option_id = %decision.option_id,
            attempts = state.attempts(),
            "Model unusable after all attempts, chose option at random"
        );
        Ok(Resolution {
            decision,
            retry: state,
        })
    }

    /// One model call: complete, parse, validate.
    async fn attempt(
        &self,
        request: &CompletionRequest,
        payload: &PromptPayload,
    ) -> Result<(String, Option<String>)> {
        let raw = tokio::time::timeout(self.config.model_timeout, self.client.complete(request))
            .await
            .map_err(|_| {
                StatecraftError::transport(
                    "model completion",
                    format!("timed out after {:?}", self.config.model_timeout),
                )
            })??;

        debug!("Model replied with {} chars", raw.len());
        let answer = parse_model_response(&raw)?;
        let option_id = validate_choice(&answer, payload.option_ids())?.to_string();
        Ok((option_id, answer.reasoning))
    }

    fn pick_random(&self, payload: &PromptPayload) -> Result<String> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| StatecraftError::validation("fallback generator lock poisoned"))?;
        payload
            .option_ids()
            .choose(&mut *rng)
            .cloned()
            .ok_or_else(|| StatecraftError::validation("no options to choose from"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueOption;
    use crate::llm::{MockLlmClient, MockReply};
    use crate::prompt::OptionFormatter;
    use std::collections::HashMap;

    fn tax_issue() -> Issue {
        Issue::new(
            "42",
            "Taxing Times",
            "The treasury is empty.",
            vec![
                IssueOption::new("1", "Lower taxes"),
                IssueOption::new("2", "Raise taxes"),
            ],
        )
    }

    fn config(max_retries: u32) -> EngineConfig {
        EngineConfig {
            max_retries,
            model_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(4)),
            log_reasoning: false,
        }
    }

    fn engine(client: &Arc<MockLlmClient>, config: EngineConfig) -> DecisionEngine {
        let client: Arc<dyn LlmClient> = client.clone();
        DecisionEngine::new(client, config).with_seed(7)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_try_success_makes_one_call() {
        let client = Arc::new(MockLlmClient::answering("2"));
        let issue = tax_issue();
        let payload = OptionFormatter::new().format(&issue).unwrap();

        let resolution = engine(&client, config(3))
            .resolve(&issue, &payload)
            .await
            .unwrap();

        assert_eq!(client.call_count(), 1);
        assert_eq!(resolution.decision.issue_id, "42");
        assert_eq!(resolution.decision.option_id, "2");
        assert_eq!(resolution.decision.method, SelectionMethod::Ai);
        assert_eq!(resolution.decision.reasoning, None);
        assert!(resolution.retry.delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_exhaust_into_random_decision() {
        let client = Arc::new(MockLlmClient::new().with_fallback(MockReply::Hang));
        let issue = tax_issue();
        let payload = OptionFormatter::new().format(&issue).unwrap();

        let resolution = engine(&client, config(3))
            .resolve(&issue, &payload)
            .await
            .unwrap();

        assert_eq!(client.call_count(), 3);
        assert_eq!(resolution.decision.method, SelectionMethod::Random);
        assert_eq!(resolution.decision.reasoning, None);
        assert!(payload.contains_option(&resolution.decision.option_id));
        assert_eq!(resolution.retry.attempts(), 3);
        assert!(resolution
            .retry
            .failures()
            .iter()
            .all(|failure| failure.kind == "transport"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_garbage_replies_consume_budget() {
        let client = Arc::new(MockLlmClient::answering("I like both 1 and 2"));
        let issue = tax_issue();
        let payload = OptionFormatter::new().format(&issue).unwrap();

        let decision = engine(&client, config(4))
            .decide(&issue, &payload)
            .await
            .unwrap();

        assert_eq!(client.call_count(), 4);
        assert_eq!(decision.method, SelectionMethod::Random);
        assert!(payload.contains_option(&decision.option_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_option_is_retried_then_accepted() {
        let client = Arc::new(
            MockLlmClient::new()
                .with_reply(MockReply::Text("7".to_string()))
                .with_reply(MockReply::Fail("connection reset".to_string()))
                .with_fallback(MockReply::Text(r#"{"option_id": "1"}"#.to_string())),
        );
        let issue = tax_issue();
        let payload = OptionFormatter::new().format(&issue).unwrap();

        let resolution = engine(&client, config(3))
            .resolve(&issue, &payload)
            .await
            .unwrap();

        assert_eq!(client.call_count(), 3);
        assert_eq!(resolution.decision.method, SelectionMethod::Ai);
        assert_eq!(resolution.decision.option_id, "1");
        let kinds: Vec<_> = resolution
            .retry
            .failures()
            .iter()
            .map(|f| f.kind)
            .collect();
        assert_eq!(kinds, vec!["validation", "transport"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_and_total_wait() {
        let client = Arc::new(MockLlmClient::new());
        let issue = tax_issue();
        let payload = OptionFormatter::new().format(&issue).unwrap();
        let cfg = config(5);
        let expected = cfg.backoff.schedule(5);

        let start = tokio::time::Instant::now();
        let resolution = engine(&client, cfg.clone())
            .resolve(&issue, &payload)
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(resolution.retry.delays(), expected.as_slice());
        assert_eq!(
            expected,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(4),
            ]
        );
        assert_eq!(elapsed, cfg.backoff.total_for(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reasoning_kept_only_when_enabled() {
        let reply = r#"{"option_id": "2", "reasoning": "Revenue matters."}"#;
        let issue = tax_issue();
        let payload = OptionFormatter::new()
            .with_reasoning(true)
            .format(&issue)
            .unwrap();

        let client = Arc::new(MockLlmClient::answering(reply));
        let quiet = engine(&client, config(3))
            .decide(&issue, &payload)
            .await
            .unwrap();
        assert_eq!(quiet.reasoning, None);

        let mut verbose_cfg = config(3);
        verbose_cfg.log_reasoning = true;
        let verbose = engine(&client, verbose_cfg)
            .decide(&issue, &payload)
            .await
            .unwrap();
        assert_eq!(verbose.reasoning.as_deref(), Some("Revenue matters."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_fallback_has_no_reasoning_even_when_enabled() {
        let client = Arc::new(MockLlmClient::new());
        let issue = tax_issue();
        let payload = OptionFormatter::new().format(&issue).unwrap();
        let mut cfg = config(2);
        cfg.log_reasoning = true;

        let decision = engine(&client, cfg)
            .decide(&issue, &payload)
            .await
            .unwrap();
        assert_eq!(decision.method, SelectionMethod::Random);
        assert_eq!(decision.reasoning, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_sends_identical_prompt() {
        let client = Arc::new(MockLlmClient::answering("nope"));
        let issue = tax_issue();
        let payload = OptionFormatter::new().format(&issue).unwrap();

        engine(&client, config(3))
            .decide(&issue, &payload)
            .await
            .unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r == &requests[0]));
        assert_eq!(requests[0].prompt, payload.text());
        assert_eq!(requests[0].temperature, Some(0.0));
        assert_eq!(
            requests[0].response_format.as_ref(),
            Some(payload.response_schema())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_fallback_covers_all_options() {
        let issue = Issue::new(
            "5",
            "Three ways",
            "",
            vec![
                IssueOption::new("0", "A"),
                IssueOption::new("1", "B"),
                IssueOption::new("2", "C"),
            ],
        );
        let payload = OptionFormatter::new().format(&issue).unwrap();
        let client = Arc::new(MockLlmClient::new());
        let engine = engine(&client, config(1));

        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..300 {
            let decision = engine.decide(&issue, &payload).await.unwrap();
            assert_eq!(decision.method, SelectionMethod::Random);
            *counts.entry(decision.option_id).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|count| *count > 50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_fallback_is_reproducible() {
        let issue = tax_issue();
        let payload = OptionFormatter::new().format(&issue).unwrap();

        let mut runs = Vec::new();
        for _ in 0..2 {
            let client = Arc::new(MockLlmClient::new());
            let engine = engine(&client, config(1));
            let mut picks = Vec::new();
            for _ in 0..10 {
                let decision = engine.decide(&issue, &payload).await.unwrap();
                picks.push(decision.option_id);
            }
            runs.push(picks);
        }
        assert_eq!(runs[0], runs[1]);
    }

    #[tokio::test]
    async fn test_empty_payload_is_rejected() {
        let client = Arc::new(MockLlmClient::answering("1"));
        let issue = Issue::new("9", "Nothing", "", Vec::new());
        let populated = tax_issue();
        let payload = OptionFormatter::new().format(&populated).unwrap();
        let engine = engine(&client, config(3));
        assert!(engine.decide(&populated, &payload).await.is_ok());

        let empty = PromptPayload::for_tests("9", Vec::new());
        let err = engine.decide(&issue, &empty).await.unwrap_err();
        assert!(matches!(err, StatecraftError::Validation { .. }));
        assert_eq!(client.call_count(), 1);
    }
}
