//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to stand in for the listing server and run the
//! fetcher and the driver against it end-to-end.

use sinta_harvest::checkpoint::CheckpointStore;
use sinta_harvest::config::{Config, ExportFormat};
use sinta_harvest::crawler::{
    create_session, run_harvest, shutdown_channel, Driver, FetchFailure, FetchOutcome,
    PageFetcher, RunOptions, ShutdownSignal, ShutdownTrigger,
};
use sinta_harvest::{Record, RunState};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration pointing at the mock server, with millisecond delays
fn create_test_config(server: &MockServer, dir: &TempDir, start: u32, end: u32) -> Config {
    let mut config = Config::default();
    config.source.base_url = format!("{}/google", server.uri());
    config.range.start_page = start;
    config.range.end_page = end;
    config.fetch.max_retries = 3;
    config.fetch.request_timeout_secs = 5;
    config.fetch.connect_timeout_secs = 5;
    config.fetch.retry_delay_ms = 1;
    config.fetch.backoff_base_ms = 1;
    config.fetch.jitter_min_ms = 0;
    config.fetch.jitter_max_ms = 0;
    config.throttle.min_delay_ms = 0;
    config.throttle.max_delay_ms = 0;
    config.checkpoint.path = dir.path().join("checkpoint.json");
    config.output.directory = dir.path().join("exports");
    config.output.debug_directory = dir.path().join("debug");
    config.output.file_prefix = "test".to_string();
    config.output.formats = vec![ExportFormat::Csv, ExportFormat::Json];
    config
}

/// One publication entry in the current listing markup
fn entry(title: &str, year: &str, cited: &str, institution: &str) -> String {
    format!(
        r#"<div class="ar-list-item">
            <div class="ar-title"><a href="https://doi.org/{slug}">{title}</a></div>
            <div class="ar-meta">
                <a class="ar-pub">{institution}</a>
                <a class="ar-year"><i class="el el-calendar"></i> {year}</a>
                <a class="ar-cited"><i class="el el-quote-right"></i> {cited} cited</a>
                <a class="ar-authors">Authors : Sari, D. ; Putra, A.</a>
            </div>
        </div>"#,
        slug = title.to_lowercase().replace(' ', "-"),
        title = title,
        year = year,
        cited = cited,
        institution = institution,
    )
}

/// A full listing page wrapping the given entries
fn listing(entries: &[String]) -> String {
    format!(
        "<html><head><title>SINTA</title></head><body><div class=\"content\">{}</div></body></html>",
        entries.concat()
    )
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Mounts a listing for one page number
async fn mount_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/google"))
        .and(query_param("page", page.to_string().as_str()))
        .respond_with(html_response(body))
        .mount(server)
        .await;
}

/// Page numbers requested from the server, in request order
async fn requested_pages(server: &MockServer) -> Vec<u32> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "page")
                .and_then(|(_, value)| value.parse().ok())
        })
        .collect()
}

fn pages_of(records: &[Record]) -> Vec<u32> {
    records.iter().map(|record| record.page).collect()
}

fn count_lines(path: &Path) -> usize {
    std::fs::read_to_string(path).unwrap().lines().count()
}

/// Serves the same listing for every page and fires shutdown once `page` is served
struct TriggerOnPage {
    page: String,
    body: String,
    trigger: ShutdownTrigger,
}

impl Respond for TriggerOnPage {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let served = request
            .url
            .query_pairs()
            .any(|(key, value)| key == "page" && value == self.page.as_str());
        if served {
            self.trigger.trigger();
        }
        html_response(self.body.clone())
    }
}

fn fetcher_for(config: &Config) -> PageFetcher {
    let base_url = Url::parse(&config.source.base_url).unwrap();
    PageFetcher::new(base_url, config.fetch.clone(), ShutdownSignal::never())
}

#[tokio::test]
async fn test_fetch_recovers_from_rate_limiting() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, 1, 1);

    Mock::given(method("GET"))
        .and(path("/google"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/google"))
        .and(header_exists("user-agent"))
        .respond_with(html_response(listing(&[entry("Paper", "2020", "1", "UI")])))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&config);
    let mut session = create_session(&config.fetch).unwrap();
    let result = fetcher.fetch_page(&mut session, 1).await;

    assert!(result.is_success());
    assert_eq!(result.attempts, 3);
    // base * 2^attempt with zero jitter
    assert_eq!(
        result.waits,
        vec![Duration::from_millis(1), Duration::from_millis(2)]
    );
    assert_eq!(result.identity_rotations, 2);
    match result.outcome {
        FetchOutcome::Success { status_code, body } => {
            assert_eq!(status_code, 200);
            assert!(body.contains("Paper"));
        }
        other => panic!("Expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, 1, 1);

    Mock::given(method("GET"))
        .and(path("/google"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&config);
    let mut session = create_session(&config.fetch).unwrap();
    let result = fetcher.fetch_page(&mut session, 7).await;

    assert_eq!(result.page, 7);
    assert_eq!(result.attempts, 3);
    // No wait after the final attempt
    assert_eq!(result.waits.len(), 2);
    assert_eq!(result.identity_rotations, 0);
    assert!(matches!(
        result.outcome,
        FetchOutcome::Failed(FetchFailure::HttpStatus(500))
    ));
}

#[tokio::test]
async fn test_fetch_rotates_identity_on_forbidden() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, 1, 1);

    Mock::given(method("GET"))
        .and(path("/google"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/google"))
        .respond_with(html_response(listing(&[])))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&config);
    let mut session = create_session(&config.fetch).unwrap();
    let result = fetcher.fetch_page(&mut session, 1).await;

    assert!(result.is_success());
    assert_eq!(result.attempts, 2);
    assert_eq!(result.identity_rotations, 1);
    assert_eq!(result.waits, vec![Duration::from_millis(1)]);
}

#[tokio::test]
async fn test_fetch_requests_page_query() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, 1, 1);

    mount_page(&server, 6673, listing(&[])).await;

    let fetcher = fetcher_for(&config);
    let mut session = create_session(&config.fetch).unwrap();
    let result = fetcher.fetch_page(&mut session, 6673).await;

    assert!(result.is_success());
    assert_eq!(result.attempts, 1);
    assert!(result.waits.is_empty());
    assert_eq!(requested_pages(&server).await, vec![6673]);
}

#[tokio::test]
async fn test_full_harvest_with_empty_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, 1, 3);
    config.checkpoint.interval = 2;

    mount_page(
        &server,
        1,
        listing(&[
            entry("Rice Yield Forecasting", "2019", "12", "Universitas Gadjah Mada"),
            entry("Coral Reef Mapping", "2021", "3", "Universitas Hasanuddin"),
        ]),
    )
    .await;
    mount_page(&server, 2, "<html><body><p>Maintenance</p></body></html>".to_string()).await;
    mount_page(
        &server,
        3,
        listing(&[entry("Batik Motif Recognition", "2016", "N/A", "Universitas Gadjah Mada")]),
    )
    .await;

    let checkpoint_path = config.checkpoint.path.clone();
    let export_dir = config.output.directory.clone();
    let debug_dir = config.output.debug_directory.clone();

    let report = run_harvest(config, RunOptions::default(), ShutdownSignal::never())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(requested_pages(&server).await, vec![1, 2, 3]);
    assert_eq!(pages_of(&report.records), vec![1, 1, 3]);
    assert_eq!(report.records[0].title, "Rice Yield Forecasting");
    assert_eq!(report.records[0].authors, "Sari, D. ; Putra, A.");
    assert_eq!(report.records[0].year, "2019");
    assert_eq!(report.records[0].citations, "12");
    assert_eq!(report.records[2].citations, "0");
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.empty_pages, vec![2]);
    assert!(report.unfetched_pages.is_empty());

    // The empty page is kept for inspection
    assert!(debug_dir.join("page_2.html").exists());

    // The periodic snapshot after page 2 is replaced by the final exports
    assert!(!export_dir.join("test_1_2_partial.csv").exists());
    assert!(!export_dir.join("test_1_2_partial.json").exists());
    let final_csv = export_dir.join("test_1_3.csv");
    assert_eq!(count_lines(&final_csv), 4);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(export_dir.join("test_1_3.json")).unwrap())
            .unwrap();
    assert_eq!(json.as_array().unwrap().len(), 3);
    assert_eq!(json[0]["Title"], "Rice Yield Forecasting");

    assert_eq!(report.summary.total_records, 3);
    assert_eq!(report.summary.year_range, Some((2016, 2021)));
    assert_eq!(report.summary.citation_total, Some(15));
    assert_eq!(report.summary.distinct_institutions, Some(2));

    let checkpoint = CheckpointStore::new(checkpoint_path).load().unwrap();
    assert_eq!(checkpoint.last_page, 3);
    assert_eq!(checkpoint.data.len(), 3);
}

#[tokio::test]
async fn test_failed_page_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, 1, 3);
    config.fetch.max_retries = 2;

    mount_page(&server, 1, listing(&[entry("First", "2018", "1", "UI")])).await;
    Mock::given(method("GET"))
        .and(path("/google"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, 3, listing(&[entry("Third", "2020", "2", "ITB")])).await;

    let report = run_harvest(config, RunOptions::default(), ShutdownSignal::never())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.unfetched_pages, vec![2]);
    assert_eq!(pages_of(&report.records), vec![1, 3]);
    assert_eq!(report.last_page, Some(3));
    assert_eq!(report.pages_fetched, 2);
}

#[tokio::test]
async fn test_resume_from_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, 1, 4);

    let previous = vec![Record::new(1, "From Page One"), Record::new(2, "From Page Two")];
    CheckpointStore::new(&config.checkpoint.path)
        .save(&previous, 2)
        .unwrap();

    mount_page(&server, 3, listing(&[entry("From Page Three", "2022", "0", "UNAIR")])).await;
    mount_page(&server, 4, listing(&[entry("From Page Four", "2023", "5", "UNAIR")])).await;

    let report = run_harvest(config, RunOptions::default(), ShutdownSignal::never())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.resumed_from, Some(2));
    assert_eq!(report.range.start, 3);
    assert_eq!(requested_pages(&server).await, vec![3, 4]);

    let titles: Vec<&str> = report.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["From Page One", "From Page Two", "From Page Three", "From Page Four"]
    );
}

#[tokio::test]
async fn test_interruption_saves_checkpoint_and_stops() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, 1, 5);
    let checkpoint_path = config.checkpoint.path.clone();
    let export_dir = config.output.directory.clone();

    let (trigger, shutdown) = shutdown_channel();
    Mock::given(method("GET"))
        .and(path("/google"))
        .respond_with(TriggerOnPage {
            page: "2".to_string(),
            body: listing(&[entry("Paper", "2020", "4", "IPB")]),
            trigger,
        })
        .mount(&server)
        .await;

    let mut driver = Driver::new(config, RunOptions::default(), shutdown);
    let report = driver.run().await.unwrap();

    assert_eq!(report.state, RunState::Interrupted);
    assert_eq!(driver.state(), RunState::Interrupted);
    assert_eq!(report.last_page, Some(2));
    assert_eq!(requested_pages(&server).await, vec![1, 2]);

    let checkpoint = CheckpointStore::new(checkpoint_path).load().unwrap();
    assert_eq!(checkpoint.last_page, 2);
    assert_eq!(pages_of(&checkpoint.data), vec![1, 2]);
    assert!(export_dir.join("test_1_2_partial.csv").exists());
}

#[tokio::test]
async fn test_interrupted_run_resumes_where_it_stopped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, 1, 3);

    let (trigger, shutdown) = shutdown_channel();
    Mock::given(method("GET"))
        .and(path("/google"))
        .respond_with(TriggerOnPage {
            page: "1".to_string(),
            body: listing(&[entry("Paper", "2020", "4", "IPB")]),
            trigger,
        })
        .mount(&server)
        .await;

    let first = run_harvest(config.clone(), RunOptions::default(), shutdown)
        .await
        .unwrap();
    assert_eq!(first.state, RunState::Interrupted);
    assert_eq!(first.last_page, Some(1));

    let second = run_harvest(config, RunOptions::default(), ShutdownSignal::never())
        .await
        .unwrap();
    assert_eq!(second.state, RunState::Completed);
    assert_eq!(second.resumed_from, Some(1));
    assert_eq!(requested_pages(&server).await, vec![1, 2, 3]);
    assert_eq!(pages_of(&second.records), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_corrupt_checkpoint_starts_fresh() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, 1, 1);
    std::fs::write(&config.checkpoint.path, "{\"data\": [ truncated").unwrap();

    mount_page(&server, 1, listing(&[entry("Only", "2017", "9", "UI")])).await;

    let report = run_harvest(config, RunOptions::default(), ShutdownSignal::never())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.resumed_from, None);
    assert_eq!(requested_pages(&server).await, vec![1]);
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_explicit_start_overrides_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, 1, 10);

    let previous = vec![
        Record::new(1, "One"),
        Record::new(2, "Two"),
        Record::new(3, "Three"),
    ];
    CheckpointStore::new(&config.checkpoint.path)
        .save(&previous, 3)
        .unwrap();

    mount_page(&server, 2, listing(&[entry("Two Again", "2020", "1", "UI")])).await;

    let options = RunOptions {
        start_page: Some(2),
        end_page: Some(2),
        reset_checkpoint: false,
    };
    let report = run_harvest(config, options, ShutdownSignal::never())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(requested_pages(&server).await, vec![2]);
    let titles: Vec<&str> = report.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Two Again"]);
    assert_eq!(report.last_page, Some(2));
}

#[tokio::test]
async fn test_periodic_snapshots_replace_each_other() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, 1, 5);
    config.checkpoint.interval = 1;
    let export_dir = config.output.directory.clone();

    let (trigger, shutdown) = shutdown_channel();
    Mock::given(method("GET"))
        .and(path("/google"))
        .respond_with(TriggerOnPage {
            page: "3".to_string(),
            body: listing(&[entry("Paper", "2020", "4", "IPB")]),
            trigger,
        })
        .mount(&server)
        .await;

    let report = run_harvest(config, RunOptions::default(), shutdown)
        .await
        .unwrap();
    assert_eq!(report.state, RunState::Interrupted);
    assert_eq!(report.last_page, Some(3));

    let mut names: Vec<String> = std::fs::read_dir(&export_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["test_1_3_partial.csv", "test_1_3_partial.json"]);
}

#[tokio::test]
async fn test_skipped_page_survives_resume() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, 1, 4);
    config.fetch.max_retries = 2;
    let checkpoint_path = config.checkpoint.path.clone();

    Mock::given(method("GET"))
        .and(path("/google"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    let (trigger, shutdown) = shutdown_channel();
    Mock::given(method("GET"))
        .and(path("/google"))
        .respond_with(TriggerOnPage {
            page: "3".to_string(),
            body: listing(&[entry("Paper", "2020", "4", "IPB")]),
            trigger,
        })
        .mount(&server)
        .await;

    let first = run_harvest(config.clone(), RunOptions::default(), shutdown)
        .await
        .unwrap();
    assert_eq!(first.state, RunState::Interrupted);
    assert_eq!(first.unfetched_pages, vec![2]);

    let checkpoint = CheckpointStore::new(&checkpoint_path).load().unwrap();
    assert_eq!(checkpoint.last_page, 3);
    assert_eq!(checkpoint.unfetched_pages, vec![2]);

    let second = run_harvest(config, RunOptions::default(), ShutdownSignal::never())
        .await
        .unwrap();
    assert_eq!(second.state, RunState::Completed);
    assert_eq!(second.resumed_from, Some(3));
    assert_eq!(second.unfetched_pages, vec![2]);
    assert_eq!(pages_of(&second.records), vec![1, 3, 4]);
    assert_eq!(requested_pages(&server).await, vec![1, 2, 2, 3, 4]);

    let checkpoint = CheckpointStore::new(&checkpoint_path).load().unwrap();
    assert_eq!(checkpoint.last_page, 4);
    assert_eq!(checkpoint.unfetched_pages, vec![2]);
}

#[tokio::test]
async fn test_abandoned_run_still_saves_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, 1, 3);
    config.checkpoint.interval = 10;
    let checkpoint_path = config.checkpoint.path.clone();

    mount_page(&server, 1, listing(&[entry("First", "2018", "1", "UI")])).await;
    Mock::given(method("GET"))
        .and(path("/google"))
        .and(query_param("page", "2"))
        .respond_with(
            html_response(listing(&[entry("Too Late", "2019", "2", "UI")]))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    // Dropping the run future mid-page must not lose page 1
    let outcome = tokio::time::timeout(
        Duration::from_millis(500),
        run_harvest(config, RunOptions::default(), ShutdownSignal::never()),
    )
    .await;
    assert!(outcome.is_err());

    let checkpoint = CheckpointStore::new(&checkpoint_path).load().unwrap();
    assert_eq!(checkpoint.last_page, 1);
    assert_eq!(pages_of(&checkpoint.data), vec![1]);
}
