//! Issue and option types.
//!
//! An [`Issue`] is a pending decision point fetched from NationStates. Options
//! keep the order in which the game presented them; that order is the only
//! mapping between what the model sees and what gets submitted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatecraftError};

/// One selectable choice within an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueOption {
    /// Identifier as sent by the game (decimal string).
    pub id: String,
    /// Human-readable option text.
    pub text: String,
}

impl IssueOption {
    /// Create a new option.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A pending issue with its ordered options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue identifier.
    pub id: String,
    /// Issue title.
    pub title: String,
    /// Descriptive text.
    pub text: String,
    /// Options in presentation order.
    pub options: Vec<IssueOption>,
}

impl Issue {
    /// Create a new issue.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
        options: Vec<IssueOption>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
            options,
        }
    }

    /// Option identifiers in presentation order.
    #[must_use]
    pub fn option_ids(&self) -> Vec<&str> {
        self.options
            .iter()
            .map(|option| option.id.as_str())
            .collect()
    }

    /// Look up an option by identifier.
    #[must_use]
    pub fn option(&self, id: &str) -> Option<&IssueOption> {
        self.options.iter().find(|option| option.id == id)
    }

    /// Check that the issue can be decided at all.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the issue has no options, an option has
    /// an empty identifier, or two options share an identifier.
    pub fn validate(&self) -> Result<()> {
        if self.options.is_empty() {
            return Err(StatecraftError::validation(format!(
                "issue {} has no options",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if option.id.trim().is_empty() {
                return Err(StatecraftError::validation(format!(
                    "issue {} has an option with an empty identifier",
                    self.id
                )));
            }
            if !seen.insert(option.id.as_str()) {
                return Err(StatecraftError::validation(format!(
                    "issue {} repeats option identifier {}",
                    self.id, option.id
                )));
            }
        }

        Ok(())
    }
}
