//! HTTP client for the NationStates API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{Result, StatecraftError};
use crate::issue::Issue;
use crate::nationstates::{
    normalize_nation_name, parse_answer, parse_issues, IssueSource, SubmissionOutcome, Submitter,
};

const LIST_OPERATION: &str = "list issues";
const ANSWER_OPERATION: &str = "answer issue";

/// Authenticated client for one nation.
#[derive(Debug, Clone)]
pub struct NationStatesClient {
    http: reqwest::Client,
    api_base: String,
    nation: String,
}

impl NationStatesClient {
    /// Public API endpoint.
    pub const DEFAULT_API_BASE: &'static str = "https://www.nationstates.net/cgi-bin/api.cgi";

    /// Per-request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a client. The nation name is normalised before use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the password or user agent cannot be
    /// sent as a header, or the HTTP client cannot be built.
    pub fn new(api_base: &str, nation: &str, password: &str, user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent.trim()).map_err(|_| {
                StatecraftError::invalid_config("user_agent", "not a valid header value")
            })?,
        );
        let mut password_header = HeaderValue::from_str(password)
            .map_err(|_| StatecraftError::invalid_config("password", "not a valid header value"))?;
        password_header.set_sensitive(true);
        headers.insert("X-Password", password_header);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                StatecraftError::config(format!("failed to create nationstates client: {e}"))
            })?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            nation: normalize_nation_name(nation),
        })
    }

    /// Normalised nation name.
    #[must_use]
    pub fn nation(&self) -> &str {
        &self.nation
    }

    async fn read_body(&self, operation: &str, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StatecraftError::transport(operation, e.to_string()))?;
        check_status(operation, status, &body)?;
        Ok(body)
    }
}

/// Map an HTTP status to the error taxonomy.
fn check_status(operation: &str, status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::NOT_FOUND
        | StatusCode::CONFLICT => Err(StatecraftError::auth(operation, status.as_u16())),
        _ => Err(StatecraftError::transport(
            operation,
            format!("HTTP {}: {}", status.as_u16(), snippet(body)),
        )),
    }
}

fn snippet(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= LIMIT {
        trimmed.to_string()
    } else {
        trimmed.chars().take(LIMIT).collect::<String>() + "..."
    }
}

fn request_error(operation: &str, error: &reqwest::Error) -> StatecraftError {
    if error.is_timeout() {
        StatecraftError::transport(operation, "request timed out")
    } else {
        StatecraftError::transport(operation, error.to_string())
    }
}

#[async_trait]
impl IssueSource for NationStatesClient {
    async fn list_pending_issues(&self) -> Result<Vec<Issue>> {
        debug!(nation = %self.nation, "Fetching pending issues");

        let response = self
            .http
            .get(&self.api_base)
            .query(&[("nation", self.nation.as_str()), ("q", "issues")])
            .send()
            .await
            .map_err(|e| request_error(LIST_OPERATION, &e))?;

        let body = self.read_body(LIST_OPERATION, response).await?;
        let issues = parse_issues(&body)?;
        debug!(count = issues.len(), "Decoded issue listing");
        Ok(issues)
    }
}

#[async_trait]
impl Submitter for NationStatesClient {
    async fn submit(&self, issue_id: &str, option_id: &str) -> Result<SubmissionOutcome> {
        debug!(nation = %self.nation, issue_id, option_id, "Submitting answer");

        let response = self
            .http
            .post(&self.api_base)
            .form(&[
                ("nation", self.nation.as_str()),
                ("c", "issue"),
                ("issue", issue_id),
                ("option", option_id),
            ])
            .send()
            .await
            .map_err(|e| request_error(ANSWER_OPERATION, &e))?;

        let body = self.read_body(ANSWER_OPERATION, response).await?;
        let receipt = parse_answer(&body)?;
        Ok(SubmissionOutcome::live(receipt.description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const LISTING: &str = r#"<NATION id="testlandia"><ISSUES>
<ISSUE id="42"><TITLE>Taxing Times</TITLE><TEXT>The treasury is empty.</TEXT>
<OPTION id="1">Lower taxes</OPTION><OPTION id="2">Raise taxes</OPTION></ISSUE>
</ISSUES></NATION>"#;

    fn client(server: &MockServer) -> NationStatesClient {
        NationStatesClient::new(
            &server.url("/cgi-bin/api.cgi"),
            "Testlandia",
            "hunter2",
            "statecraft-tests",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_sends_credentials_and_query() {
        let server = MockServer::start();
        let listing = server.mock(|when, then| {
            when.method(GET)
                .path("/cgi-bin/api.cgi")
                .query_param("nation", "testlandia")
                .query_param("q", "issues")
                .header("user-agent", "statecraft-tests")
                .header("x-password", "hunter2");
            then.status(200).body(LISTING);
        });

        let issues = client(&server).list_pending_issues().await.unwrap();
        listing.assert();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "42");
        assert_eq!(issues[0].option_ids(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_list_maps_rejected_credentials_to_auth() {
        for status in [401, 403, 409] {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/cgi-bin/api.cgi");
                then.status(status).body("Forbidden");
            });

            let err = client(&server).list_pending_issues().await.unwrap_err();
            assert!(
                matches!(err, StatecraftError::Auth { status: s, .. } if s == status),
                "status {status} gave {err:?}"
            );
            assert!(err.is_fatal());
        }
    }

    #[tokio::test]
    async fn test_list_maps_throttling_and_outages_to_transport() {
        for status in [429, 500, 503] {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/cgi-bin/api.cgi");
                then.status(status).body("slow down");
            });

            let err = client(&server).list_pending_issues().await.unwrap_err();
            assert!(err.is_retryable(), "status {status} gave {err:?}");
        }
    }

    #[tokio::test]
    async fn test_list_rejects_undecodable_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/cgi-bin/api.cgi");
            then.status(200).body("<html>maintenance</html>");
        });

        let err = client(&server).list_pending_issues().await.unwrap_err();
        assert!(matches!(err, StatecraftError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_list_unreachable_server_is_transport() {
        let client = NationStatesClient::new(
            "http://127.0.0.1:9/cgi-bin/api.cgi",
            "testlandia",
            "hunter2",
            "statecraft-tests",
        )
        .unwrap();
        let err = client.list_pending_issues().await.unwrap_err();
        assert!(matches!(err, StatecraftError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_submit_posts_form_and_returns_description() {
        let server = MockServer::start();
        let answer = server.mock(|when, then| {
            when.method(POST)
                .path("/cgi-bin/api.cgi")
                .header("x-password", "hunter2")
                .form_urlencoded_tuple("nation", "testlandia")
                .form_urlencoded_tuple("c", "issue")
                .form_urlencoded_tuple("issue", "42")
                .form_urlencoded_tuple("option", "2");
            then.status(200).body(
                r#"<NATION id="testlandia"><ISSUE id="42" choice="2"><OK>1</OK><DESC>Taxes rose.</DESC></ISSUE></NATION>"#,
            );
        });

        let outcome = client(&server).submit("42", "2").await.unwrap();
        answer.assert();
        assert!(!outcome.dry_run);
        assert_eq!(outcome.description.as_deref(), Some("Taxes rose."));
    }

    #[tokio::test]
    async fn test_submit_reports_game_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/cgi-bin/api.cgi");
            then.status(200).body(
                r#"<NATION id="testlandia"><ISSUE id="42" choice="7"><ERROR>Invalid choice.</ERROR></ISSUE></NATION>"#,
            );
        });

        let err = client(&server).submit("42", "7").await.unwrap_err();
        assert!(matches!(err, StatecraftError::Parse { .. }));
    }

    #[test]
    fn test_new_rejects_unprintable_password() {
        let err = NationStatesClient::new(
            NationStatesClient::DEFAULT_API_BASE,
            "testlandia",
            "bad\npassword",
            "statecraft-tests",
        )
        .unwrap_err();
        assert!(matches!(err, StatecraftError::InvalidConfig { .. }));
    }

    #[test]
    fn test_new_normalises_nation() {
        let client = NationStatesClient::new(
            NationStatesClient::DEFAULT_API_BASE,
            " New Example ",
            "pw",
            "ua",
        )
        .unwrap();
        assert_eq!(client.nation(), "new_example");
    }

    #[test]
    fn test_check_status_passes_success() {
        assert!(check_status("x", StatusCode::OK, "").is_ok());
        assert!(matches!(
            check_status("x", StatusCode::BAD_REQUEST, "bad").unwrap_err(),
            StatecraftError::Transport { .. }
        ));
    }
}
