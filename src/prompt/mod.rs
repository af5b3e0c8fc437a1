//! Prompt generation for issue decisions.
//!
//! - [`formatter`] - Turns an [`Issue`](crate::issue::Issue) into a canonical
//!   [`PromptPayload`] for the decision engine
//!
//! # Example
//!
//! ```
//! use statecraft::issue::{Issue, IssueOption};
//! use statecraft::prompt::OptionFormatter;
//!
//! let issue = Issue::new(
//!     "42",
//!     "Taxing Times",
//!     "The treasury is empty.",
//!     vec![IssueOption::new("1", "Lower taxes"), IssueOption::new("2", "Raise taxes")],
//! );
//!
//! let payload = OptionFormatter::new().format(&issue).expect("well-formed issue");
//! assert!(payload.text().contains("[2] Raise taxes"));
//! assert_eq!(payload.option_ids(), ["1", "2"]);
//! ```

pub mod formatter;

pub use formatter::{OptionFormatter, PromptPayload, TRUNCATION_MARKER};
