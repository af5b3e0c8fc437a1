//! Decoding of NationStates XML responses.

use serde::Deserialize;

use crate::error::{Result, StatecraftError};
use crate::issue::{Issue, IssueOption};

#[derive(Debug, Deserialize)]
struct NationXml {
    #[serde(rename = "ISSUES", default)]
    issues: Option<IssuesXml>,
    #[serde(rename = "ISSUE", default)]
    answered: Option<AnsweredIssueXml>,
    #[serde(rename = "ERROR", default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IssuesXml {
    #[serde(rename = "ISSUE", default)]
    issue: Vec<IssueXml>,
}

#[derive(Debug, Deserialize)]
struct IssueXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "TITLE", default)]
    title: String,
    #[serde(rename = "TEXT", default)]
    text: String,
    #[serde(rename = "OPTION", default)]
    options: Vec<OptionXml>,
}

#[derive(Debug, Deserialize)]
struct OptionXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnsweredIssueXml {
    #[serde(rename = "OK", default)]
    ok: Option<String>,
    #[serde(rename = "ERROR", default)]
    error: Option<String>,
    #[serde(rename = "DESC", default)]
    desc: Option<String>,
}

/// Result of an answer submission as reported by the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerReceipt {
    /// Consequence text, when the game sent one.
    pub description: Option<String>,
}

/// Decode the `q=issues` shard into issues, keeping option order.
///
/// # Errors
///
/// Returns a parse error if the document is not a NationStates nation
/// response or an issue has no options or repeats an option id.
pub fn parse_issues(xml: &str) -> Result<Vec<Issue>> {
    let nation = decode_nation("issue listing", xml)?;

    if let Some(error) = nation.error {
        return Err(StatecraftError::parse("issue listing", error));
    }

    let issues: Vec<Issue> = nation
        .issues
        .unwrap_or_default()
        .issue
        .into_iter()
        .map(|issue| {
            Issue::new(
                issue.id.trim(),
                issue.title.trim(),
                issue.text.trim(),
                issue
                    .options
                    .into_iter()
                    .map(|option| IssueOption::new(option.id.trim(), option.text.trim()))
                    .collect(),
            )
        })
        .collect();

    for issue in &issues {
        issue
            .validate()
            .map_err(|e| StatecraftError::parse("issue listing", e.to_string()))?;
    }
    Ok(issues)
}

/// Decode the response to an `c=issue` command.
///
/// # Errors
///
/// Returns a parse error if the document cannot be decoded, reports an
/// error, or does not confirm the answer.
pub fn parse_answer(xml: &str) -> Result<AnswerReceipt> {
    let nation = decode_nation("answer response", xml)?;

    if let Some(error) = nation.error {
        return Err(StatecraftError::parse("answer response", error));
    }

    let answered = nation.answered.ok_or_else(|| {
        StatecraftError::parse("answer response", "response has no ISSUE element")
    })?;

    if let Some(error) = answered.error {
        return Err(StatecraftError::parse("answer response", error));
    }
    if answered.ok.as_deref().map(str::trim) != Some("1") {
        return Err(StatecraftError::parse(
            "answer response",
            "game did not confirm the answer",
        ));
    }

    Ok(AnswerReceipt {
        description: answered
            .desc
            .map(|desc| desc.trim().to_string())
            .filter(|desc| !desc.is_empty()),
    })
}

fn decode_nation(context: &str, xml: &str) -> Result<NationXml> {
    let mut body = xml.trim_start();
    if body.starts_with("<?xml") {
        body = body
            .find("?>")
            .map_or("", |end| body[end + 2..].trim_start());
    }
    if !body.starts_with("<NATION") {
        return Err(StatecraftError::parse(
            context,
            "response is not a NATION document",
        ));
    }
    quick_xml::de::from_str(body)
        .map_err(|e| StatecraftError::parse(context, e.to_string()))
}
