//! Testing infrastructure for Statecraft.
//!
//! This module provides mocks, fixtures, and assertions for testing the
//! decision pipeline without a model server or the NationStates API.
//!
//! # Architecture
//!
//! The testing infrastructure is organized into:
//! - **Mocks**: Scripted stand-ins for the issue listing, the answer call and
//!   the language model
//! - **Fixtures**: Canned issues, API responses and a dry-run configuration
//! - **Assertions**: Checks for decisions against the issue they answer
//!
//! # Example
//!
//! ```rust,ignore
//! use statecraft::testing::{tax_issue, MockIssueSource, MockLlmClient, MockSubmitter};
//!
//! let source = MockIssueSource::listing(vec![tax_issue()]);
//! let submitter = MockSubmitter::new();
//! let llm = MockLlmClient::answering(r#"{"option_id": "2"}"#);
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mocks;

pub use crate::llm::{MockLlmClient, MockReply};
pub use assertions::*;
pub use fixtures::*;
pub use mocks::*;
