//! Integration tests for the Statecraft CLI

use std::fs;
use std::path::Path;

use assert_cmd::cargo;
use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

use statecraft::testing::{listing_xml, tax_issue};

const CONFIG_ENV: &[&str] = &[
    "NATION",
    "PASSWORD",
    "USER_AGENT",
    "SLEEP_BETWEEN_REQUESTS",
    "TEST_MODE",
    "SINGLE_RUN",
    "OLLAMA_MODEL",
    "MAX_RETRIES",
    "LOG_REASONING",
    "OLLAMA_HOST",
    "MODEL_TIMEOUT",
    "CYCLE_INTERVAL",
    "LOG_FILE",
    "NATIONSTATES_API",
    "RUST_LOG",
];

/// Get a Command for the statecraft binary, isolated from the caller's
/// environment and working directory.
fn statecraft(dir: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("statecraft"));
    cmd.current_dir(dir);
    for var in CONFIG_ENV {
        cmd.env_remove(var);
    }
    cmd
}

fn credentials(cmd: &mut Command) -> &mut Command {
    cmd.args([
        "--nation",
        "Testlandia",
        "--password",
        "hunter2",
        "--user-agent",
        "statecraft-tests",
        "--ollama-host",
        "http://127.0.0.1:9",
    ])
}

#[test]
fn test_help() {
    let temp = TempDir::new().unwrap();
    statecraft(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Answer NationStates issues"));
}

#[test]
fn test_version() {
    let temp = TempDir::new().unwrap();
    statecraft(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_check_config_requires_nation() {
    let temp = TempDir::new().unwrap();
    statecraft(temp.path())
        .arg("check-config")
        .assert()
        .failure()
        .code(7)
        .stderr(predicate::str::contains("nation"));
}

#[test]
fn test_check_config_redacts_password() {
    let temp = TempDir::new().unwrap();
    let mut cmd = statecraft(temp.path());
    cmd.arg("check-config");
    credentials(&mut cmd)
        .assert()
        .success()
        .stdout(predicate::str::contains("[REDACTED]"))
        .stdout(predicate::str::contains("hunter2").not())
        .stdout(predicate::str::contains("Testlandia"));
}

#[test]
fn test_check_config_reads_environment() {
    let temp = TempDir::new().unwrap();
    statecraft(temp.path())
        .arg("check-config")
        .env("NATION", "Testlandia")
        .env("PASSWORD", "hunter2")
        .env("USER_AGENT", "statecraft-tests")
        .env("OLLAMA_HOST", "http://127.0.0.1:9")
        .env("TEST_MODE", "false")
        .env("MAX_RETRIES", "5")
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run:           false"))
        .stdout(predicate::str::contains("max retries:       5"));
}

#[test]
fn test_check_config_file_is_overridden_by_flags() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("statecraft.toml"),
        "model = \"phi3\"\nmax_retries = 4\n",
    )
    .unwrap();

    let mut cmd = statecraft(temp.path());
    cmd.args(["check-config", "--max-retries", "2"]);
    credentials(&mut cmd)
        .assert()
        .success()
        .stdout(predicate::str::contains("model:             phi3"))
        .stdout(predicate::str::contains("max retries:       2"));
}

#[test]
fn test_check_config_rejects_zero_retries() {
    let temp = TempDir::new().unwrap();
    let mut cmd = statecraft(temp.path());
    cmd.args(["check-config", "--max-retries", "0"]);
    credentials(&mut cmd)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_retries"));
}

#[test]
fn test_log_counts_records_and_skips_torn_lines() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("choices.ndjson");
    fs::write(
        &path,
        concat!(
            r#"{"timestamp":1.0,"issue_id":"42","title":"T","option_id":"2","chosen_option_text":"x","method":"AI"}"#,
            "\n",
            r#"{"timestamp":2.0,"issue_id":"43","title":"T","option_id":"1","chosen_option_text":"y","method":"RANDOM"}"#,
            "\n",
            r#"{"timestamp":3.0,"issue_"#,
        ),
    )
    .unwrap();

    statecraft(temp.path())
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 valid records (1 AI, 1 RANDOM)"))
        .stdout(predicate::str::contains("1 unreadable line(s) skipped"));
}

#[test]
fn test_log_missing_file_is_empty() {
    let temp = TempDir::new().unwrap();
    statecraft(temp.path())
        .args(["log", "--file", "nothing-here.ndjson"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 valid records"));
}

#[test]
fn test_dry_run_single_cycle_falls_back_without_model() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start();
    let listing = server.mock(|when, then| {
        when.method(GET)
            .path("/api.cgi")
            .query_param("q", "issues");
        then.status(200).body(listing_xml(&[tax_issue()]));
    });
    let answer = server.mock(|when, then| {
        when.method(POST).path("/api.cgi");
        then.status(200)
            .body("<NATION><ISSUE><OK>1</OK></ISSUE></NATION>");
    });

    let mut cmd = statecraft(temp.path());
    cmd.args([
        "run",
        "--dry-run",
        "--single-run",
        "--request-delay",
        "0",
        "--backoff-base",
        "0",
        "--backoff-ceiling",
        "0",
        "--max-retries",
        "2",
        "--api-base",
        &server.url("/api.cgi"),
    ]);
    credentials(&mut cmd)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 resolved (0 AI, 1 RANDOM)"));

    listing.assert();
    answer.assert_calls(0);

    let log_path = temp.path().join("choices.ndjson");
    let log = fs::read_to_string(log_path).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains(r#""issue_id":"42""#));
    assert!(log.contains(r#""method":"RANDOM""#));
}
