//! Custom assertions for domain-specific testing.
//!
//! Provides expressive assertions for checking decisions against the issue
//! they answer.

use crate::decision::{Decision, SelectionMethod};
use crate::issue::Issue;

/// Assert that a decision answers `issue` with one of its own options.
///
/// # Panics
///
/// Panics if the issue id differs or the option is not offered by the issue.
///
/// # Example
///
/// ```rust,ignore
/// let decision = engine.decide(&issue, &payload).await?;
/// assert_decision_valid(&decision, &issue);
/// ```
pub fn assert_decision_valid(decision: &Decision, issue: &Issue) {
    assert_eq!(
        decision.issue_id, issue.id,
        "Decision answers issue {} but was expected to answer {}",
        decision.issue_id, issue.id
    );
    assert!(
        issue.option(&decision.option_id).is_some(),
        "Decision chose option {:?}, which issue {} does not offer (valid: {:?})",
        decision.option_id,
        issue.id,
        issue.option_ids()
    );
}

/// Assert that a decision came from the model and chose `option_id`.
///
/// # Panics
///
/// Panics if the method or the option differs.
pub fn assert_ai_choice(decision: &Decision, option_id: &str) {
    assert_eq!(
        decision.method,
        SelectionMethod::Ai,
        "Expected an AI decision, got {} for option {}",
        decision.method,
        decision.option_id
    );
    assert_eq!(decision.option_id, option_id);
}

/// Assert that a decision is a random fallback without reasoning.
///
/// # Panics
///
/// Panics if the method is not `RANDOM` or reasoning is present.
pub fn assert_random_fallback(decision: &Decision) {
    assert_eq!(
        decision.method,
        SelectionMethod::Random,
        "Expected a RANDOM fallback, got {}",
        decision.method
    );
    assert!(
        decision.reasoning.is_none(),
        "Random fallback carried reasoning: {:?}",
        decision.reasoning
    );
}
