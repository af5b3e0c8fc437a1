//! Strict parsing of model replies.
//!
//! Model output is untrusted. A reply is accepted only if it names exactly one
//! option, either as a JSON object or as a bare identifier. Whitespace,
//! quoting, code fences, an `Option` prefix and letter case are tolerated;
//! anything that could name more than one option is rejected.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, StatecraftError};

const CONTEXT: &str = "model response";

/// A JSON reply. Keys other than these are rejected, and so is any key
/// given twice (`option` counts as `option_id`).
///
/// `option_number` is deliberately absent: older prompts used it for a
/// one-based position, which is not an option identifier.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonReply {
    #[serde(alias = "option")]
    option_id: Option<Value>,
    reasoning: Option<String>,
}

/// A single answer extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnswer {
    /// Identifier exactly as the model wrote it (trimmed).
    pub option_id: String,
    /// Optional justification.
    pub reasoning: Option<String>,
}

fn bare_answer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(?i:option)?\s*[#:]?\s*["'\[(]?([A-Za-z0-9_-]+)["'\])]?\.?$"#)
            .expect("bare answer pattern is valid")
    })
}

/// Parse a raw model reply into a single answer.
///
/// # Errors
///
/// Returns a parse error if the reply is empty, malformed, or names zero or
/// several options.
pub fn parse_model_response(raw: &str) -> Result<ParsedAnswer> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(StatecraftError::parse(CONTEXT, "empty reply"));
    }

    if body.starts_with('{') {
        return parse_json_answer(body);
    }

    let captures = bare_answer_regex().captures(body).ok_or_else(|| {
        StatecraftError::parse(
            CONTEXT,
            format!("expected a single option identifier, got {:?}", preview(body)),
        )
    })?;

    Ok(ParsedAnswer {
        option_id: captures[1].to_string(),
        reasoning: None,
    })
}

/// Resolve a parsed identifier against the valid option set.
///
/// An exact match wins; otherwise a single case-insensitive match is
/// accepted. Returns the canonical identifier from `option_ids`.
///
/// # Errors
///
/// Returns a validation error if no option, or more than one option, matches.
pub fn validate_choice<'a>(answer: &ParsedAnswer, option_ids: &'a [String]) -> Result<&'a str> {
    let exact = option_ids.iter().find(|id| **id == answer.option_id);
    if let Some(exact) = exact {
        return Ok(exact.as_str());
    }

    let mut folded = option_ids
        .iter()
        .filter(|id| id.eq_ignore_ascii_case(&answer.option_id));
    match (folded.next(), folded.next()) {
        (Some(only), None) => Ok(only.as_str()),
        (Some(_), Some(_)) => Err(StatecraftError::validation(format!(
            "option {:?} matches several options when case is ignored",
            answer.option_id
        ))),
        (None, _) => Err(StatecraftError::validation(format!(
            "option {:?} is not one of [{}]",
            answer.option_id,
            option_ids.join(", ")
        ))),
    }
}

fn parse_json_answer(body: &str) -> Result<ParsedAnswer> {
    let reply: JsonReply = serde_json::from_str(body)
        .map_err(|e| StatecraftError::parse(CONTEXT, format!("invalid JSON answer: {e}")))?;

    let raw = reply
        .option_id
        .ok_or_else(|| StatecraftError::parse(CONTEXT, "JSON reply has no option_id"))?;

    Ok(ParsedAnswer {
        option_id: scalar_identifier("option_id", &raw)?,
        reasoning: reply
            .reasoning
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
    })
}

fn scalar_identifier(key: &str, raw: &Value) -> Result<String> {
    let id = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if n.is_u64() || n.is_i64() => n.to_string(),
        Value::Array(_) => {
            return Err(StatecraftError::parse(
                CONTEXT,
                format!("{key} lists several answers"),
            ))
        }
        other => {
            return Err(StatecraftError::parse(
                CONTEXT,
                format!("{key} has unsupported value {other}"),
            ))
        }
    };

    if id.is_empty() || id.contains(char::is_whitespace) || id.contains(',') {
        return Err(StatecraftError::parse(
            CONTEXT,
            format!("{key} is not a single identifier: {id:?}"),
        ));
    }
    Ok(id)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 80;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn parsed(raw: &str) -> String {
        parse_model_response(raw).unwrap().option_id
    }

    #[test]
    fn test_bare_identifier() {
        assert_eq!(parsed("2"), "2");
        assert_eq!(parsed("  2 \n"), "2");
        assert_eq!(parsed("\"2\""), "2");
        assert_eq!(parsed("[2]"), "2");
        assert_eq!(parsed("2."), "2");
    }

    #[test]
    fn test_option_prefix_any_case() {
        assert_eq!(parsed("Option 2"), "2");
        assert_eq!(parsed("OPTION: 3"), "3");
        assert_eq!(parsed("option #1"), "1");
    }

    #[test]
    fn test_json_answer_with_reasoning() {
        let answer =
            parse_model_response(r#"{"option_id": "1", "reasoning": " Growth first. "}"#).unwrap();
        assert_eq!(answer.option_id, "1");
        assert_eq!(answer.reasoning.as_deref(), Some("Growth first."));
    }

    #[test]
    fn test_json_integer_and_option_alias() {
        assert_eq!(parsed(r#"{"option_id": 2}"#), "2");
        assert_eq!(parsed(r#"{"option": "0"}"#), "0");
    }

    #[test]
    fn test_positional_keys_are_not_identifiers() {
        // A one-based position would pick the wrong option when ids start at 0
        assert!(parse_model_response(r#"{"option_number": 1}"#).is_err());
        assert!(parse_model_response(r#"{"choice": 4}"#).is_err());
    }

    #[test]
    fn test_json_in_code_fence() {
        assert_eq!(parsed("```json\n{\"option_id\": \"2\"}\n```"), "2");
    }

    #[test]
    fn test_rejects_empty_reply() {
        assert!(parse_model_response("   ").is_err());
    }

    #[test]
    fn test_rejects_multi_answer_text() {
        for raw in ["1, 2", "1 or 2", "1 and 2", "I think 2 is best", "1\n2"] {
            let err = parse_model_response(raw).unwrap_err();
            assert!(matches!(err, StatecraftError::Parse { .. }), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_rejects_multi_answer_json() {
        assert!(parse_model_response(r#"{"option_id": ["1", "2"]}"#).is_err());
        assert!(parse_model_response(r#"{"option_id": "1, 2"}"#).is_err());
        assert!(parse_model_response(r#"{"option_id": "1", "option_number": 2}"#).is_err());
    }

    #[test]
    fn test_rejects_repeated_json_keys() {
        for raw in [
            r#"{"option_id": "1", "option_id": "2"}"#,
            r#"{"option_id": "2", "option_id": "2"}"#,
            r#"{"option_id": "1", "option": "2"}"#,
            r#"{"option_id": "1", "reasoning": "a", "reasoning": "b"}"#,
        ] {
            let err = parse_model_response(raw).unwrap_err();
            assert!(matches!(err, StatecraftError::Parse { .. }), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_rejects_json_without_option() {
        assert!(parse_model_response(r#"{"reasoning": "hmm"}"#).is_err());
        assert!(parse_model_response(r#"{"option_id": 1.5}"#).is_err());
        assert!(parse_model_response("[1]x").is_err());
        assert!(parse_model_response("{not json").is_err());
    }

    #[test]
    fn test_empty_reasoning_is_none() {
        let answer = parse_model_response(r#"{"option_id": "1", "reasoning": "  "}"#).unwrap();
        assert_eq!(answer.reasoning, None);
    }

    #[test]
    fn test_validate_exact_match() {
        let options = ids(&["1", "2"]);
        let answer = parse_model_response("2").unwrap();
        assert_eq!(validate_choice(&answer, &options).unwrap(), "2");
    }

    #[test]
    fn test_validate_case_insensitive_match() {
        let options = ids(&["a", "B"]);
        let answer = parse_model_response("b").unwrap();
        assert_eq!(validate_choice(&answer, &options).unwrap(), "B");
    }

    #[test]
    fn test_validate_rejects_ambiguous_case_fold() {
        let options = ids(&["a", "A"]);
        let answer = ParsedAnswer {
            option_id: "a".to_string(),
            reasoning: None,
        };
        assert_eq!(validate_choice(&answer, &options).unwrap(), "a");

        let folded = ParsedAnswer {
            option_id: "A".to_string(),
            reasoning: None,
        };
        assert_eq!(validate_choice(&folded, &options).unwrap(), "A");

        let options = ids(&["ab", "AB"]);
        let neither = ParsedAnswer {
            option_id: "Ab".to_string(),
            reasoning: None,
        };
        assert!(validate_choice(&neither, &options).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_option() {
        let options = ids(&["1", "2"]);
        let answer = parse_model_response("3").unwrap();
        let err = validate_choice(&answer, &options).unwrap_err();
        assert!(matches!(err, StatecraftError::Validation { .. }));
    }
}
