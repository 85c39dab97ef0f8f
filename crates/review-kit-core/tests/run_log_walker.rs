//! Walker contract tests against a scripted transport.
//!
//! Archives are built in memory with `zip::ZipWriter` and served from the
//! fake storage URL the run-logs endpoint redirects to.

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use review_kit_core::fakes::ScriptedTransport;
use review_kit_core::{
    Conclusion, HttpResponse, HttpTransport, JobMetadata, LogSource, RedirectMode, Repository,
    RunLogError, RunLogWalker, StepMetadata,
};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

const API: &str = "https://api.test";
const RUN_LOGS: &str = "https://api.test/repos/octo/widgets/actions/runs/99/logs";
const BLOB: &str = "https://blob.test/runs/99/logs.zip";

// ===========================================================================
// Fixtures
// ===========================================================================

fn repo() -> Repository {
    Repository::new("octo", "widgets")
}

fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn job(name: &str, steps: Vec<StepMetadata>) -> JobMetadata {
    JobMetadata {
        id: 7,
        run_id: 99,
        run_attempt: None,
        name: name.to_string(),
        status: None,
        conclusion: Some(Conclusion::Failure),
        steps,
    }
}

fn step(number: u32, name: &str, conclusion: Conclusion) -> StepMetadata {
    StepMetadata::new(number, name, Some(conclusion))
}

/// Transport serving `archive` behind a single `302` from the run-logs endpoint.
fn serving(archive: Vec<u8>) -> Arc<ScriptedTransport> {
    Arc::new(
        ScriptedTransport::new(API)
            .with_response(RUN_LOGS, HttpResponse::redirect(302, BLOB))
            .with_response(BLOB, HttpResponse::new(200, archive)),
    )
}

fn job_walker(transport: Arc<ScriptedTransport>) -> RunLogWalker<ScriptedTransport> {
    RunLogWalker::for_job(transport, repo(), &job("build", vec![])).unwrap()
}

// ===========================================================================
// Fetch
// ===========================================================================

#[tokio::test]
async fn fetch_opens_archive_from_resolved_location() {
    let transport = serving(zip_bytes(&[("build/1_checkout.txt", "ok")]));
    let mut walker = job_walker(transport.clone());
    assert!(!walker.is_fetched());

    walker.fetch(3).await.unwrap();

    assert!(walker.is_fetched());
    assert_eq!(walker.location().unwrap().url, BLOB);
    assert_eq!(walker.archive().unwrap().len(), 1);
    let requests = transport.requests();
    assert_eq!(requests[0], (RUN_LOGS.to_string(), RedirectMode::Manual));
    assert_eq!(requests[1], (BLOB.to_string(), RedirectMode::Follow));
}

#[tokio::test]
async fn fetch_redirect_chain_of_length_k_needs_k_hops() {
    let hop1 = "https://api.test/repositories/1/actions/runs/99/logs";
    let hop2 = "https://api.test/repositories/2/actions/runs/99/logs";
    let transport = Arc::new(
        ScriptedTransport::new(API)
            .with_response(RUN_LOGS, HttpResponse::redirect(301, hop1))
            .with_response(hop1, HttpResponse::redirect(301, hop2))
            .with_response(hop2, HttpResponse::redirect(302, BLOB))
            .with_response(BLOB, HttpResponse::new(200, zip_bytes(&[("build/1_a.txt", "a")]))),
    );

    let mut walker = job_walker(transport);
    walker.fetch(2).await.unwrap();
    assert_eq!(walker.location().unwrap().url, BLOB);
    assert_eq!(walker.location().unwrap().chain.len(), 3);

    let err = walker.fetch(1).await.unwrap_err();
    assert!(matches!(
        err,
        RunLogError::RedirectLimitExceeded { max_redirects: 1, .. }
    ));
    assert!(!walker.is_fetched());
}

#[tokio::test]
async fn fetch_download_failure_is_download_error() {
    let transport = Arc::new(
        ScriptedTransport::new(API)
            .with_response(RUN_LOGS, HttpResponse::redirect(302, BLOB))
            .with_response(BLOB, HttpResponse::new(500, "")),
    );
    let mut walker = job_walker(transport);
    let err = walker.fetch(3).await.unwrap_err();
    assert!(matches!(err, RunLogError::Download { url, .. } if url == BLOB));
}

#[tokio::test]
async fn fetch_non_zip_body_is_archive_format_error() {
    let transport = serving(b"<html>expired</html>".to_vec());
    let mut walker = job_walker(transport);
    let err = walker.fetch(3).await.unwrap_err();
    assert!(matches!(err, RunLogError::ArchiveFormat(_)));
    assert!(!walker.is_fetched());
}

#[tokio::test]
async fn fetch_can_be_repeated() {
    let transport = serving(zip_bytes(&[("build/1_a.txt", "a")]));
    let mut walker = job_walker(transport);
    walker.fetch(3).await.unwrap();
    walker.fetch(3).await.unwrap();
    assert!(walker.is_fetched());
}

#[tokio::test]
async fn fetch_through_check_run_source() {
    let job_json = serde_json::json!({"id": 7, "run_id": 99, "run_attempt": null, "name": "build"});
    let transport = Arc::new(
        ScriptedTransport::new(API)
            .with_json("https://api.test/repos/octo/widgets/actions/jobs/7", &job_json)
            .with_response(RUN_LOGS, HttpResponse::redirect(302, BLOB))
            .with_response(BLOB, HttpResponse::new(200, zip_bytes(&[("build/1_a.txt", "a")]))),
    );
    let mut walker = RunLogWalker::new(transport, repo(), LogSource::CheckRun { check_run_id: 7 });
    walker.fetch(3).await.unwrap();
    assert!(walker.is_fetched());
}

/// Transport whose requests never complete.
struct StalledTransport;

#[async_trait]
impl HttpTransport for StalledTransport {
    fn api_base(&self) -> &str {
        API
    }

    async fn get(&self, _url: &str, _redirects: RedirectMode) -> review_kit_core::Result<HttpResponse> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn fetch_is_abandoned_when_caller_times_out() {
    let mut walker = RunLogWalker::for_job(
        Arc::new(StalledTransport),
        repo(),
        &job("build", vec![]),
    )
    .unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(50), walker.fetch(3)).await;
    assert!(outcome.is_err());
    assert!(!walker.is_fetched());
}

// ===========================================================================
// Walk
// ===========================================================================

#[tokio::test]
async fn walk_before_fetch_is_not_fetched() {
    let walker = job_walker(serving(zip_bytes(&[])));
    let steps = vec![step(1, "checkout", Conclusion::Success)];

    let err = walker
        .walk(&job("build", steps), |_, _| Ok::<(), RunLogError>(()))
        .unwrap_err();
    assert!(matches!(err, RunLogError::NotFetched));

    let err = walker
        .walk(&job("build", vec![]), |_, _| Ok::<(), RunLogError>(()))
        .unwrap_err();
    assert!(matches!(err, RunLogError::NotFetched));
}

#[tokio::test]
async fn walk_without_step_metadata_is_no_steps() {
    let mut walker = job_walker(serving(zip_bytes(&[("build/1_a.txt", "a")])));
    walker.fetch(3).await.unwrap();

    let err = walker
        .walk(&job("build", vec![]), |_, _| Ok::<(), RunLogError>(()))
        .unwrap_err();
    assert!(matches!(err, RunLogError::NoSteps { job } if job == "build"));
}

#[tokio::test]
async fn walk_visits_steps_in_order_with_content() {
    let mut walker = job_walker(serving(zip_bytes(&[
        ("build/5_deploy.txt", "deploying"),
        ("build/1_checkout.txt", "checking out"),
        ("build/3_test.txt", "testing"),
        ("lint/1_checkout.txt", "other job"),
    ])));
    walker.fetch(3).await.unwrap();

    let metadata = job(
        "build",
        vec![
            step(1, "checkout", Conclusion::Success),
            step(2, "setup", Conclusion::Success),
            step(3, "test", Conclusion::Success),
            step(5, "deploy", Conclusion::Success),
        ],
    );

    let mut seen = Vec::new();
    walker
        .walk(&metadata, |meta, log| {
            assert_eq!(meta.number, log.number());
            assert_eq!(log.job_name(), "build");
            seen.push((meta.name.clone(), log.read_to_string()?));
            Ok::<(), RunLogError>(())
        })
        .unwrap();

    assert_eq!(
        seen,
        vec![
            ("checkout".to_string(), "checking out".to_string()),
            ("test".to_string(), "testing".to_string()),
            ("deploy".to_string(), "deploying".to_string()),
        ]
    );
}

#[tokio::test]
async fn walk_job_missing_from_archive_is_job_not_found() {
    let mut walker = job_walker(serving(zip_bytes(&[("build/1_a.txt", "a")])));
    walker.fetch(3).await.unwrap();

    let metadata = job("deploy", vec![step(1, "a", Conclusion::Success)]);
    let err = walker
        .walk(&metadata, |_, _| Ok::<(), RunLogError>(()))
        .unwrap_err();
    assert!(matches!(err, RunLogError::JobNotFound { job } if job == "deploy"));
}

#[tokio::test]
async fn walk_aborts_on_unmatched_step_number() {
    let mut walker = job_walker(serving(zip_bytes(&[
        ("build/1_checkout.txt", "one"),
        ("build/7_mystery.txt", "seven"),
        ("build/8_cleanup.txt", "eight"),
    ])));
    walker.fetch(3).await.unwrap();

    let metadata = job(
        "build",
        vec![
            step(1, "checkout", Conclusion::Success),
            step(8, "cleanup", Conclusion::Success),
        ],
    );

    let mut visited = Vec::new();
    let err = walker
        .walk(&metadata, |meta, _| {
            visited.push(meta.number);
            Ok::<(), RunLogError>(())
        })
        .unwrap_err();

    assert!(matches!(
        err,
        RunLogError::StepMismatch { ref job, step: 7 } if job == "build"
    ));
    assert_eq!(visited, vec![1]);
}

#[derive(Debug)]
enum VisitError {
    Walk(RunLogError),
    Stop(u32),
}

impl From<RunLogError> for VisitError {
    fn from(err: RunLogError) -> Self {
        VisitError::Walk(err)
    }
}

#[tokio::test]
async fn walk_returns_visitor_error_unchanged() {
    let mut walker = job_walker(serving(zip_bytes(&[
        ("build/1_a.txt", "a"),
        ("build/2_b.txt", "b"),
        ("build/3_c.txt", "c"),
    ])));
    walker.fetch(3).await.unwrap();

    let metadata = job(
        "build",
        (1..=3).map(|n| step(n, "s", Conclusion::Success)).collect(),
    );
    let mut calls = 0;
    let err = walker
        .walk(&metadata, |meta, _| {
            calls += 1;
            if meta.number == 2 {
                return Err(VisitError::Stop(2));
            }
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, VisitError::Stop(2)));
    assert_eq!(calls, 2);
}

#[tokio::test]
async fn walk_propagates_walker_errors_into_visitor_error_type() {
    let walker = job_walker(serving(zip_bytes(&[])));
    let metadata = job("build", vec![step(1, "a", Conclusion::Success)]);
    let err = walker.walk(&metadata, |_, _| Ok::<(), VisitError>(())).unwrap_err();
    assert!(matches!(err, VisitError::Walk(RunLogError::NotFetched)));
}

#[tokio::test]
async fn walk_records_only_failed_step_content() {
    let mut walker = job_walker(serving(zip_bytes(&[
        ("build/1_checkout.txt", "Cloning into 'widgets'...\n"),
        ("build/2_test.txt", "test parser::tests::empty ... FAILED\n"),
        ("0_build.txt", "whole job log\n"),
    ])));
    walker.fetch(3).await.unwrap();

    let metadata = job(
        "build",
        vec![
            step(1, "checkout", Conclusion::Success),
            step(2, "test", Conclusion::Failure),
        ],
    );

    let mut failed = Vec::new();
    walker
        .walk(&metadata, |meta, log| {
            if meta.failed() {
                failed.push((meta.number, log.read_content()?));
            }
            Ok::<(), RunLogError>(())
        })
        .unwrap();

    assert_eq!(
        failed,
        vec![(2, b"test parser::tests::empty ... FAILED\n".to_vec())]
    );
}

#[tokio::test]
async fn walk_accepts_boxed_error_visitors() {
    let mut walker = job_walker(serving(zip_bytes(&[("build/1_a.txt", "a")])));
    walker.fetch(3).await.unwrap();
    let metadata = job("build", vec![step(1, "a", Conclusion::Success)]);

    let result: Result<(), Box<dyn std::error::Error + Send + Sync>> =
        walker.walk(&metadata, |_, log| {
            log.read_content()?;
            Ok(())
        });
    assert!(result.is_ok());
}
