//! Tests for the partnerscraper binary.

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::fixtures::fixture_path;
use common::wiremock_helpers::{config_for, mount_page};
use partnerscraper::adapters::SourceId;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;
use wiremock::MockServer;

fn partnerscraper() -> assert_cmd::Command {
    cargo_bin_cmd!("partnerscraper")
}

#[test]
fn test_sources_lists_every_source_with_columns() {
    partnerscraper()
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("starterstory"))
        .stdout(predicate::str::contains("abbhome"))
        .stdout(predicate::str::contains("birbank"))
        .stdout(predicate::str::contains("xalqbank"))
        .stdout(predicate::str::contains("pashabank"))
        .stdout(predicate::str::contains("complex_name, complex_slug"));
}

#[test]
fn test_init_writes_default_config() {
    let tmp = TempDir::new().unwrap();
    partnerscraper()
        .current_dir(tmp.path())
        .arg("--init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created default configuration"));

    let written = fs::read_to_string(tmp.path().join("config/partnerscraper.toml")).unwrap();
    assert!(written.contains("[sources.birbank]"));
}

#[test]
fn test_parse_fixture_offline_to_csv() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out/xalqbank.csv");

    partnerscraper()
        .current_dir(tmp.path())
        .args(["parse", "--source", "xalqbank", "--input"])
        .arg(fixture_path("xalqbank.html"))
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total rows written: 2"));

    let csv = fs::read_to_string(&output).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("name,region,address,phone,website,logo_url"));
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_parse_infers_json_from_output_extension() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("birbank.json");

    partnerscraper()
        .current_dir(tmp.path())
        .args(["parse", "-s", "birbank", "-i"])
        .arg(fixture_path("birbank.json"))
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 4);
}

#[test]
fn test_parse_missing_input_fails() {
    let tmp = TempDir::new().unwrap();
    partnerscraper()
        .current_dir(tmp.path())
        .args(["parse", "--source", "abbhome", "--input", "does-not-exist.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.html"));
}

#[test]
fn test_run_without_config_fails_with_hint() {
    let tmp = TempDir::new().unwrap();
    partnerscraper()
        .current_dir(tmp.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--init"));
}

#[tokio::test]
async fn test_run_against_mock_server() {
    let server = MockServer::start().await;
    let body = fs::read_to_string(fixture_path("pashabank.html")).unwrap();
    mount_page(&server, "/pashabank", &body, "text/html").await;

    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("scraper.toml");
    fs::write(&config_path, config_for(&server.uri(), &[SourceId::PashaBank])).unwrap();
    let out_dir = tmp.path().join("exports");

    let assert = tokio::task::spawn_blocking(move || {
        partnerscraper()
            .arg("--config")
            .arg(&config_path)
            .args(["run", "--output-dir"])
            .arg(&out_dir)
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("pashabank"))
        .stdout(predicate::str::contains("Total rows written: 2"));
    assert!(tmp.path().join("exports/pashabank.csv").exists());
}

#[tokio::test]
async fn test_run_writes_json_report() {
    let server = MockServer::start().await;
    let body = fs::read_to_string(fixture_path("xalqbank.html")).unwrap();
    mount_page(&server, "/xalqbank", &body, "text/html").await;

    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("scraper.toml");
    fs::write(&config_path, config_for(&server.uri(), &[SourceId::XalqBank])).unwrap();
    let out_dir = tmp.path().join("exports");
    let report_path = tmp.path().join("run-report.json");

    let report_arg = report_path.clone();
    let assert = tokio::task::spawn_blocking(move || {
        partnerscraper()
            .arg("--config")
            .arg(&config_path)
            .args(["run", "--output-dir"])
            .arg(&out_dir)
            .arg("--report")
            .arg(&report_arg)
            .assert()
    })
    .await
    .unwrap();

    assert.success().stdout(predicate::str::contains("time"));

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let entries = report.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["source"], "xalqbank");
    assert_eq!(entries[0]["rows_written"], 2);
    assert!(entries[0]["error"].is_null());
    let started = entries[0]["started_at"].as_str().unwrap();
    let finished = entries[0]["finished_at"].as_str().unwrap();
    let started = chrono::DateTime::parse_from_rfc3339(started).unwrap();
    let finished = chrono::DateTime::parse_from_rfc3339(finished).unwrap();
    assert!(finished >= started);
}
