//! Canonical prompt layout for a single issue.
//!
//! The layout is fixed so the model always sees the same structure: a short
//! preamble, the issue title and text, one `[id] text` line per option in the
//! game's order, and the answer instructions. Long option text is cut and
//! marked with [`TRUNCATION_MARKER`]; it is never shortened silently.

use serde_json::{json, Value};

use crate::error::Result;
use crate::issue::Issue;

/// Marker appended to option text that was cut to fit the configured limit.
pub const TRUNCATION_MARKER: &str = " [truncated]";

const PREAMBLE: &str = "You are the leader of a nation in NationStates. An issue has arisen.";

const GUIDANCE: &str = "Choose the best option for your nation. \
Consider economic stability, civil rights, and political freedom.";

/// Formats issues into prompt payloads.
#[derive(Debug, Clone)]
pub struct OptionFormatter {
    max_option_chars: usize,
    request_reasoning: bool,
}

impl Default for OptionFormatter {
    fn default() -> Self {
        Self {
            max_option_chars: Self::DEFAULT_MAX_OPTION_CHARS,
            request_reasoning: false,
        }
    }
}

impl OptionFormatter {
    /// Default per-option character limit.
    pub const DEFAULT_MAX_OPTION_CHARS: usize = 2000;

    /// Create a formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-option character limit.
    #[must_use]
    pub fn with_max_option_chars(mut self, max_option_chars: usize) -> Self {
        self.max_option_chars = max_option_chars.max(1);
        self
    }

    /// Ask the model for a short justification alongside its choice.
    #[must_use]
    pub fn with_reasoning(mut self, request_reasoning: bool) -> Self {
        self.request_reasoning = request_reasoning;
        self
    }

    /// Build the prompt payload for an issue.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the issue has no options or its option
    /// identifiers are blank or repeated.
    pub fn format(&self, issue: &Issue) -> Result<PromptPayload> {
        issue.validate()?;

        let mut text = String::new();
        text.push_str(PREAMBLE);
        text.push_str("\n\n");
        text.push_str(&format!("Issue #{}: {}\n", issue.id, single_line(&issue.title)));
        if !issue.text.trim().is_empty() {
            text.push_str(issue.text.trim());
            text.push('\n');
        }
        text.push_str("\nOptions:\n");

        let mut truncated = Vec::new();
        for option in &issue.options {
            let (option_text, was_cut) = self.clip(&single_line(&option.text));
            if was_cut {
                truncated.push(option.id.clone());
            }
            text.push_str(&format!("[{}] {}\n", option.id, option_text));
        }

        let option_ids: Vec<String> = issue.options.iter().map(|o| o.id.clone()).collect();
        let id_list = option_ids
            .iter()
            .map(|id| format!("\"{id}\""))
            .collect::<Vec<_>>()
            .join(", ");

        text.push('\n');
        text.push_str(GUIDANCE);
        text.push('\n');
        if self.request_reasoning {
            text.push_str(&format!(
                "Respond with a JSON object containing \"option_id\" (one of: {id_list}) \
                 and \"reasoning\" (a brief explanation of why you chose this option)."
            ));
        } else {
            text.push_str(&format!(
                "Respond with a JSON object containing only \"option_id\" (one of: {id_list})."
            ));
        }

        let response_schema = response_schema(&option_ids, self.request_reasoning);

        Ok(PromptPayload {
            issue_id: issue.id.clone(),
            text,
            option_ids,
            truncated,
            response_schema,
        })
    }

    fn clip(&self, text: &str) -> (String, bool) {
        if text.chars().count() <= self.max_option_chars {
            return (text.to_string(), false);
        }
        let mut clipped: String = text.chars().take(self.max_option_chars).collect();
        clipped.push_str(TRUNCATION_MARKER);
        (clipped, true)
    }
}

/// The formatted prompt plus the option set captured at formatting time.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPayload {
    issue_id: String,
    text: String,
    option_ids: Vec<String>,
    truncated: Vec<String>,
    response_schema: Value,
}

impl PromptPayload {
    /// Identifier of the issue this payload was built from.
    #[must_use]
    pub fn issue_id(&self) -> &str {
        &self.issue_id
    }

    /// Prompt text sent to the model.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Valid option identifiers, in presentation order.
    #[must_use]
    pub fn option_ids(&self) -> &[String] {
        &self.option_ids
    }

    /// Check whether an identifier belongs to the captured option set.
    #[must_use]
    pub fn contains_option(&self, id: &str) -> bool {
        self.option_ids.iter().any(|known| known == id)
    }

    /// Identifiers of options whose text was truncated.
    #[must_use]
    pub fn truncated(&self) -> &[String] {
        &self.truncated
    }

    /// JSON schema describing the expected answer object.
    #[must_use]
    pub fn response_schema(&self) -> &Value {
        &self.response_schema
    }

    #[cfg(test)]
    pub(crate) fn for_tests(issue_id: &str, option_ids: Vec<String>) -> Self {
        Self {
            issue_id: issue_id.to_string(),
            text: String::new(),
            response_schema: response_schema(&option_ids, false),
            option_ids,
            truncated: Vec::new(),
        }
    }
}

fn response_schema(option_ids: &[String], with_reasoning: bool) -> Value {
    if with_reasoning {
        json!({
            "type": "object",
            "properties": {
                "option_id": { "type": "string", "enum": option_ids },
                "reasoning": { "type": "string" }
            },
            "required": ["option_id", "reasoning"]
        })
    } else {
        json!({
            "type": "object",
            "properties": {
                "option_id": { "type": "string", "enum": option_ids }
            },
            "required": ["option_id"]
        })
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
