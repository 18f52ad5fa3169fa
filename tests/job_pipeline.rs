//! End-to-end job runs against a local HTTP server

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use batch_prober::{
    config::JobsConfig,
    database::Database,
    errors::AppError,
    models::{CheckRequest, JobResultStatus, JobStatus, JobView},
    repositories::JobRepository,
    services::{CoordinatorSettings, HttpPinger, JobCoordinator, Prober},
};

/// Serve `/fast` (50ms) and `/slow` (2s) on an ephemeral port
async fn spawn_target_server() -> String {
    let app = Router::new()
        .route(
            "/fast",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                "ok"
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// An address nothing listens on
async fn refused_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn coordinator() -> (JobCoordinator, Database) {
    let database = Database::in_memory().await.unwrap();
    database.migrate().await.unwrap();

    let pinger = HttpPinger::from_config(&JobsConfig::default()).unwrap();
    let coordinator = JobCoordinator::new(
        Arc::new(JobRepository::new(database.pool())),
        Prober::new(Arc::new(pinger)),
        CoordinatorSettings {
            default_timeout_ms: 1_000,
            concurrency_ceiling: 8,
        },
    );
    (coordinator, database)
}

async fn wait_for_terminal(coordinator: &JobCoordinator, job_id: &str) -> JobView {
    for _ in 0..200 {
        let view = assert_ok!(coordinator.retrieve(job_id).await);
        if view.status.is_terminal() {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_id} did not finish");
}

#[tokio::test]
async fn test_fast_and_slow_targets() {
    let base = spawn_target_server().await;
    let (coordinator, _) = coordinator().await;
    let fast = format!("{base}/fast");
    let slow = format!("{base}/slow");

    let accepted = assert_ok!(
        coordinator
            .check(CheckRequest::new([fast.clone(), slow.clone()], 2, 500))
            .await
    );
    assert_eq!(accepted.status, JobStatus::Pending);

    let view = wait_for_terminal(&coordinator, &accepted.job_id).await;
    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.results.len(), 2);

    let fast_result = view.results.iter().find(|r| r.url == fast).unwrap();
    assert_eq!(fast_result.status, JobResultStatus::Completed);
    assert!(fast_result.latency_ms >= 50, "{}", fast_result.latency_ms);
    assert!(fast_result.latency_ms < 500, "{}", fast_result.latency_ms);

    let slow_result = view.results.iter().find(|r| r.url == slow).unwrap();
    assert_eq!(slow_result.status, JobResultStatus::Timeout);
    assert_eq!(slow_result.latency_ms, 500);

    assert!(view.duration_ms >= 500, "{}", view.duration_ms);
    assert!(view.duration_ms < 2_000, "{}", view.duration_ms);
}

#[tokio::test]
async fn test_connection_errors_fail_the_job() {
    let (coordinator, _) = coordinator().await;
    let first = refused_address().await;
    let second = refused_address().await;

    let accepted = assert_ok!(
        coordinator
            .check(CheckRequest::new([first, second], 2, 1_000))
            .await
    );
    let view = wait_for_terminal(&coordinator, &accepted.job_id).await;

    assert_eq!(view.status, JobStatus::Failed);
    assert_eq!(view.results.len(), 2);
    for result in &view.results {
        assert_eq!(result.status, JobResultStatus::Failed);
        assert_eq!(result.latency_ms, 0);
    }
}

#[tokio::test]
async fn test_empty_urls_rejected_without_persisting() {
    let (coordinator, database) = coordinator().await;

    let err = assert_err!(
        coordinator
            .check(CheckRequest::new(Vec::<String>::new(), 1, 1_000))
            .await
    );
    assert!(matches!(err, AppError::Validation { .. }));

    let jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
        .fetch_one(&database.pool())
        .await
        .unwrap();
    assert_eq!(jobs, 0);
}

#[tokio::test]
async fn test_every_submitted_url_gets_a_result() {
    let base = spawn_target_server().await;
    let (coordinator, _) = coordinator().await;
    let fast = format!("{base}/fast");
    let urls = vec![fast.clone(); 7];

    let accepted = assert_ok!(coordinator.check(CheckRequest::new(urls, 3, 1_000)).await);
    let view = wait_for_terminal(&coordinator, &accepted.job_id).await;

    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.results.len(), 7);
    assert!(view.results.iter().all(|r| r.url == fast));
    let max_latency = view.results.iter().map(|r| r.latency_ms).max().unwrap();
    assert!(view.duration_ms >= max_latency);
}

#[tokio::test]
async fn test_cancelled_job_finalizes_promptly() {
    let base = spawn_target_server().await;
    let (coordinator, _) = coordinator().await;
    let slow = format!("{base}/slow");

    let accepted = assert_ok!(
        coordinator
            .check(CheckRequest::new(vec![slow; 4], 1, 10_000))
            .await
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    let cancelled = assert_ok!(coordinator.cancel(&accepted.job_id).await);
    assert!(cancelled.cancelled);

    let view = tokio::time::timeout(
        Duration::from_secs(1),
        wait_for_terminal(&coordinator, &accepted.job_id),
    )
    .await
    .expect("cancelled job did not finalize");
    assert_eq!(view.status, JobStatus::Failed);
    assert!(view.results.len() < 4);
}
