//! End-to-end source runs against mock HTTP servers.

mod common;

use common::fixtures::load_fixture;
use common::wiremock_helpers::{config_for, mount_page, mount_status};
use partnerscraper::adapters::SourceId;
use partnerscraper::config::AppConfig;
use partnerscraper::export::OutputFormat;
use partnerscraper::fetch::{FetchError, Fetcher};
use partnerscraper::logger::RunProgress;
use partnerscraper::pipeline::run_sources;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_run_writes_each_source_and_isolates_failures() {
    let server = MockServer::start().await;
    mount_page(&server, "/birbank", &load_fixture("birbank.json"), "application/json").await;
    mount_page(&server, "/pashabank", &load_fixture("pashabank.html"), "text/html").await;
    mount_status(&server, "/xalqbank", 500).await;

    let sources = [SourceId::BirBank, SourceId::XalqBank, SourceId::PashaBank];
    let config = AppConfig::from_toml(&config_for(&server.uri(), &sources)).unwrap();
    let out = TempDir::new().unwrap();
    let progress = RunProgress::hidden();

    let reports = run_sources(&config, &sources, None, out.path(), &progress).await.unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(progress.position(), 3);

    let birbank = &reports[0];
    assert_eq!(birbank.source, SourceId::BirBank);
    assert!(birbank.is_success());
    assert_eq!(birbank.rows_written, 4);
    assert_eq!(birbank.skipped, 2);
    let csv = fs::read_to_string(out.path().join("birbank.csv")).unwrap();
    let header_line = csv.lines().next().unwrap();
    assert_eq!(header_line, SourceId::BirBank.schema().join(","));
    assert_eq!(csv.lines().count(), 5);

    let xalqbank = &reports[1];
    assert!(!xalqbank.is_success());
    assert!(xalqbank.error.as_deref().unwrap().contains("500"));
    assert_eq!(xalqbank.rows_written, 0);
    assert_eq!(xalqbank.seen, 0);
    assert!(!out.path().join("xalqbank.csv").exists());

    let pashabank = &reports[2];
    assert!(pashabank.is_success());
    assert_eq!(pashabank.rows_written, 2);
    assert_eq!(pashabank.output.as_deref(), Some(out.path().join("pashabank.csv").as_path()));
}

#[tokio::test]
async fn test_run_format_override_switches_extension() {
    let server = MockServer::start().await;
    mount_page(&server, "/abbhome", &load_fixture("abbhome.html"), "text/html").await;

    let config = AppConfig::from_toml(&config_for(&server.uri(), &[SourceId::AbbHome])).unwrap();
    let out = TempDir::new().unwrap();

    let reports = run_sources(
        &config,
        &[SourceId::AbbHome],
        Some(OutputFormat::Json),
        out.path(),
        &RunProgress::hidden(),
    )
    .await
    .unwrap();

    assert_eq!(reports[0].rows_written, 2);
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("abbhome.json")).unwrap()).unwrap();
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "Alpha İnşaat");
    assert_eq!(rows[1]["project_count"], 0);
    assert!(rows[1]["address"].is_null());
}

#[tokio::test]
async fn test_starterstory_json_nests_revenue() {
    let server = MockServer::start().await;
    mount_page(&server, "/starterstory", &load_fixture("starterstory.html"), "text/html").await;

    let config = AppConfig::from_toml(&config_for(&server.uri(), &[SourceId::StarterStory])).unwrap();
    let out = TempDir::new().unwrap();

    let reports = run_sources(&config, &[SourceId::StarterStory], None, out.path(), &RunProgress::hidden())
        .await
        .unwrap();
    assert_eq!(reports[0].rows_written, 2);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("starterstory.json")).unwrap()).unwrap();
    let rows = json.as_array().unwrap();
    let acme = rows[0].as_object().unwrap();
    let amount = acme["revenue"]["amount"].as_f64().unwrap();
    assert!((amount - 8330.0).abs() < 1e-6);
    assert_eq!(acme["revenue"]["raw_text"], "$8.33K");
    assert_eq!(acme["revenue"]["period"], "/mo");
    assert!(!acme.contains_key("revenue_amount"));
    assert!(!acme.contains_key("revenue_period"));

    let keys: Vec<&str> = acme.keys().map(String::as_str).collect();
    assert_eq!(&keys[..4], &["business_name", "business_icon", "idea_description", "revenue"]);
    assert!(rows[1]["revenue"]["amount"].is_null());
}

#[tokio::test]
async fn test_starterstory_csv_keeps_flat_revenue_columns() {
    let server = MockServer::start().await;
    mount_page(&server, "/starterstory", &load_fixture("starterstory.html"), "text/html").await;

    let config = AppConfig::from_toml(&config_for(&server.uri(), &[SourceId::StarterStory])).unwrap();
    let out = TempDir::new().unwrap();

    run_sources(
        &config,
        &[SourceId::StarterStory],
        Some(OutputFormat::Csv),
        out.path(),
        &RunProgress::hidden(),
    )
    .await
    .unwrap();

    let csv = fs::read_to_string(out.path().join("starterstory.csv")).unwrap();
    let header_line = csv.lines().next().unwrap();
    assert_eq!(header_line, SourceId::StarterStory.schema().join(","));
    assert!(csv.contains(",$8.33K,/mo,"));
}

#[tokio::test]
async fn test_structurally_changed_page_reports_zero_rows() {
    let server = MockServer::start().await;
    mount_page(&server, "/starterstory", "<html><body>Redesigned!</body></html>", "text/html").await;

    let config = AppConfig::from_toml(&config_for(&server.uri(), &[SourceId::StarterStory])).unwrap();
    let out = TempDir::new().unwrap();
    fs::write(out.path().join("starterstory.json"), "[{\"business_name\": \"last week\"}]\n").unwrap();

    let reports = run_sources(&config, &[SourceId::StarterStory], None, out.path(), &RunProgress::hidden())
        .await
        .unwrap();
    let report = &reports[0];
    assert!(report.is_success());
    assert_eq!(report.rows_written, 0);
    assert!(report.output.is_none());
    assert!(!out.path().join("starterstory.json").exists());
}

#[tokio::test]
async fn test_unconfigured_source_is_reported_not_fatal() {
    let server = MockServer::start().await;
    let config = AppConfig::from_toml(&config_for(&server.uri(), &[])).unwrap();
    let out = TempDir::new().unwrap();

    let reports = run_sources(&config, &[SourceId::XalqBank], None, out.path(), &RunProgress::hidden())
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].error.is_some());
}

#[tokio::test]
async fn test_fetch_sends_configured_headers_and_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xalqbank"))
        .and(header("accept-language", "az"))
        .and(header("cookie", "lang=az; session=abc"))
        .and(header("user-agent", "partnerscraper-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("xalqbank.html")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config_text = config_for(&server.uri(), &[SourceId::XalqBank]);
    config_text.push_str(
        "\n[sources.xalqbank.headers]\naccept-language = \"az\"\n\n[sources.xalqbank.cookies]\nlang = \"az\"\nsession = \"abc\"\n",
    );
    let config = AppConfig::from_toml(&config_text).unwrap();
    let fetcher = Fetcher::new(&config.http).unwrap();

    let document = fetcher.fetch(config.source(SourceId::XalqBank).unwrap()).await.unwrap();
    match document {
        partnerscraper::RawDocument::Text(body) => assert!(body.contains("loan__item")),
        other => panic!("unexpected document: {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_non_success_status_is_an_error() {
    let server = MockServer::start().await;
    mount_status(&server, "/birbank", 403).await;

    let config = AppConfig::from_toml(&config_for(&server.uri(), &[SourceId::BirBank])).unwrap();
    let fetcher = Fetcher::new(&config.http).unwrap();

    let err = fetcher.fetch(config.source(SourceId::BirBank).unwrap()).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 403, .. }));
}
