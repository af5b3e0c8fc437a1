//! Test fixtures: canned issues, API responses and configuration.

use std::path::Path;
use std::time::Duration;

use crate::config::{BotConfig, ConfigLayer};
use crate::issue::{Issue, IssueOption};

/// Issue #42, the two-option tax dilemma used across the test suite.
#[must_use]
pub fn tax_issue() -> Issue {
    Issue::new(
        "42",
        "Taxing Times",
        "The treasury is empty and the finance minister wants answers.",
        vec![
            IssueOption::new("1", "Lower taxes to stimulate growth."),
            IssueOption::new("2", "Raise taxes to balance the budget."),
        ],
    )
}

/// Issue #77, three options numbered from zero.
#[must_use]
pub fn bridge_issue() -> Issue {
    Issue::new(
        "77",
        "Bridge Out",
        "The main river bridge has collapsed.",
        vec![
            IssueOption::new("0", "Rebuild it with public money."),
            IssueOption::new("1", "Run ferries until a contractor is found."),
            IssueOption::new("2", "Leave it; people can swim."),
        ],
    )
}

/// Issue-listing XML for the given issues, shaped like the live API.
#[must_use]
pub fn listing_xml(issues: &[Issue]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<NATION id=\"testlandia\"><ISSUES>");
    for issue in issues {
        xml.push_str(&format!(
            "<ISSUE id=\"{}\"><TITLE>{}</TITLE><TEXT>{}</TEXT><AUTHOR>fixture</AUTHOR><PIC1>t1</PIC1><PIC2>t2</PIC2>",
            issue.id,
            escape(&issue.title),
            escape(&issue.text)
        ));
        for option in &issue.options {
            xml.push_str(&format!(
                "<OPTION id=\"{}\">{}</OPTION>",
                option.id,
                escape(&option.text)
            ));
        }
        xml.push_str("</ISSUE>");
    }
    xml.push_str("</ISSUES></NATION>");
    xml
}

/// Successful answer XML with a consequence description.
#[must_use]
pub fn answer_xml(issue_id: &str, option_id: &str, description: &str) -> String {
    format!(
        "<NATION id=\"testlandia\"><ISSUE id=\"{issue_id}\" choice=\"{option_id}\"><OK>1</OK><DESC>{}</DESC></ISSUE></NATION>",
        escape(description)
    )
}

/// Valid dry-run configuration writing its log under `dir`, with no
/// request spacing or backoff so tests run instantly.
#[must_use]
pub fn test_config(dir: &Path) -> BotConfig {
    let layer = ConfigLayer {
        nation: Some("testlandia".to_string()),
        password: Some("hunter2".to_string()),
        user_agent: Some("statecraft-tests".to_string()),
        request_delay_secs: Some(0),
        dry_run: Some(true),
        single_run: Some(true),
        backoff_base_secs: Some(0),
        backoff_ceiling_secs: Some(0),
        log_file: Some(dir.join("choices.ndjson")),
        ..ConfigLayer::default()
    };
    match BotConfig::from_layer(layer) {
        Ok(mut config) => {
            config.model_timeout = Duration::from_secs(5);
            config
        }
        Err(e) => panic!("fixture configuration is invalid: {e}"),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
