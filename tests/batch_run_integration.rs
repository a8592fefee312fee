//! End-to-end runs of the batch engine against the in-memory store

mod common;

use common::*;
use docbatch::batch::{
    BackfillDefault, BatchRun, CheckpointStore, DeleteAll, NormalizeDates, RunPhase, ScanMode,
    ShutdownSignal,
};
use docbatch::error::{BatchError, ErrorCode};
use docbatch::store::{FaultKind, Value};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_purge_250_documents_in_three_batches() {
    let store = memory_store_with((0..250).map(log_entry)).await;

    let mut run = BatchRun::new(
        Arc::new(store.clone()),
        Box::new(DeleteAll),
        run_options("purge-logs", "logs", 100, 100, ScanMode::Requery),
    );
    let summary = run.run().await.unwrap();

    assert_eq!(store.committed_batches().await, vec![100, 100, 50]);
    assert_eq!(summary.documents_affected, 250);
    assert_eq!(store.count("logs").await, 0);
    // The last fetch is the empty page that ends the scan.
    assert_eq!(summary.pages_fetched, 4);
    assert!(summary.to_string().ends_with("documents affected: 250"));
}

#[tokio::test]
async fn test_migrates_only_valid_date_strings() {
    let store = memory_store_with([agreement(
        "a1",
        &[
            ("startDate", Value::from("2025-10-01")),
            ("endDate", Value::from("bad-value")),
        ],
    )])
    .await;

    let mut run = BatchRun::new(
        Arc::new(store.clone()),
        Box::new(NormalizeDates::default()),
        run_options("migrate-dates", "agreements", 500, 500, ScanMode::Cursor),
    );
    let summary = run.run().await.unwrap();
    assert_eq!(summary.documents_affected, 1);

    let doc = store.get("agreements", "a1").await.unwrap();
    assert_eq!(doc.get("startDate"), Some(&midnight_utc(2025, 10, 1)));
    assert_eq!(doc.get("endDate"), Some(&Value::from("bad-value")));
    assert_eq!(doc.get("agreementDate"), None);
}

#[tokio::test]
async fn test_second_migration_is_a_no_op() {
    let store = memory_store_with([agreement(
        "a1",
        &[
            ("startDate", Value::from("2025-10-01")),
            ("endDate", Value::from("bad-value")),
        ],
    )])
    .await;
    let options = run_options("migrate-dates", "agreements", 500, 500, ScanMode::Cursor);

    BatchRun::new(
        Arc::new(store.clone()),
        Box::new(NormalizeDates::default()),
        options.clone(),
    )
    .run()
    .await
    .unwrap();
    let migrated = store.get("agreements", "a1").await.unwrap();
    store.reset_counters().await;

    let summary = BatchRun::new(
        Arc::new(store.clone()),
        Box::new(NormalizeDates::default()),
        options,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.operations_queued, 0);
    assert!(summary.nothing_to_do());
    assert_eq!(store.commit_attempts().await, 0);
    assert_eq!(store.get("agreements", "a1").await.unwrap(), migrated);
}

#[tokio::test]
async fn test_backfill_touches_only_members_without_company() {
    // Every fourth member lacks a company: 300 of 1200.
    let members = (0..1200).map(|i| member(i, (i % 4 != 0).then_some("Acme")));
    let store = memory_store_with(members).await;

    let mut run = BatchRun::new(
        Arc::new(store.clone()),
        Box::new(BackfillDefault::new("company", "N/A")),
        run_options("backfill-company", "members", 500, 500, ScanMode::Cursor),
    );
    let summary = run.run().await.unwrap();

    assert_eq!(summary.documents_scanned, 1200);
    assert_eq!(summary.operations_queued, 300);
    assert_eq!(store.committed_batches().await, vec![125, 125, 50]);

    let docs = store.documents("members").await;
    let filled = docs
        .iter()
        .filter(|d| d.get("company") == Some(&Value::from("N/A")))
        .count();
    let untouched = docs
        .iter()
        .filter(|d| d.get("company") == Some(&Value::from("Acme")))
        .count();
    assert_eq!(filled, 300);
    assert_eq!(untouched, 900);
}

#[tokio::test]
async fn test_commit_failure_stops_run_and_rerun_finishes() {
    let agreements = (0..30).map(|i| {
        agreement(
            &format!("a{i:03}"),
            &[("startDate", Value::from("2024-03-05"))],
        )
    });
    let store = memory_store_with(agreements).await;
    store.fail_commit_attempt(2, FaultKind::PermissionDenied).await;
    let options = run_options("migrate-dates", "agreements", 30, 10, ScanMode::Cursor);

    let mut run = BatchRun::new(
        Arc::new(store.clone()),
        Box::new(NormalizeDates::default()),
        options.clone(),
    );
    let err = run.run().await.unwrap_err();

    assert!(matches!(err, BatchError::Commit { batch: 2, size: 10, .. }));
    assert_eq!(err.code(), ErrorCode::COMMIT_PERMISSION_DENIED);
    assert_eq!(err.exit_code(), 1);
    assert_eq!(run.state().phase, RunPhase::Failed);
    assert_eq!(run.state().batches_committed, 1);
    // Batch 3 was never sent.
    assert_eq!(store.commit_attempts().await, 2);
    let migrated = store
        .documents("agreements")
        .await
        .iter()
        .filter(|d| matches!(d.get("startDate"), Some(Value::Timestamp(_))))
        .count();
    assert_eq!(migrated, 10);

    store.reset_counters().await;
    let summary = BatchRun::new(
        Arc::new(store.clone()),
        Box::new(NormalizeDates::default()),
        options,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.operations_queued, 20);
    assert_eq!(store.committed_batches().await, vec![10, 10]);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let store = memory_store_with((0..20).map(log_entry)).await;
    store.fail_query_attempt(1, FaultKind::Connection).await;
    store.fail_commit_attempt(1, FaultKind::Unavailable).await;

    let mut options = run_options("purge-logs", "logs", 10, 10, ScanMode::Requery);
    options.retry = fast_retry(3);
    let summary = BatchRun::new(Arc::new(store.clone()), Box::new(DeleteAll), options)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.documents_affected, 20);
    assert_eq!(store.committed_batches().await, vec![10, 10]);
    assert_eq!(store.count("logs").await, 0);
}

#[tokio::test]
async fn test_resume_continues_after_last_committed_page() {
    let temp_dir = TempDir::new().unwrap();
    let checkpoints = CheckpointStore::new(temp_dir.path());
    let store = memory_store_with((0..30).map(|i| member(i, None))).await;
    store.fail_commit_attempt(2, FaultKind::InvalidArgument).await;
    let options = run_options("backfill-company", "members", 10, 10, ScanMode::Cursor);

    let mut first = BatchRun::new(
        Arc::new(store.clone()),
        Box::new(BackfillDefault::new("company", "N/A")),
        options.clone(),
    )
    .with_checkpoints(checkpoints.clone(), false);
    first.run().await.unwrap_err();

    let saved = checkpoints
        .load("backfill-company", "members")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.cursor.as_ref().map(|c| c.as_str()), Some("m00009"));
    assert_eq!(saved.batches_committed, 1);
    assert_eq!(saved.documents_affected, 10);

    let mut second = BatchRun::new(
        Arc::new(store.clone()),
        Box::new(BackfillDefault::new("company", "N/A")),
        options,
    )
    .with_checkpoints(checkpoints.clone(), true);
    let summary = second.run().await.unwrap();

    assert_eq!(summary.documents_scanned, 20);
    assert_eq!(summary.documents_affected, 20);
    assert!(checkpoints
        .load("backfill-company", "members")
        .await
        .unwrap()
        .is_none());
    assert!(store
        .documents("members")
        .await
        .iter()
        .all(|d| d.get("company") == Some(&Value::from("N/A"))));
}

#[tokio::test]
async fn test_cancelled_run_reports_signal_exit_code() {
    let store = memory_store_with((0..5).map(log_entry)).await;
    let shutdown = ShutdownSignal::new();
    shutdown.request_shutdown();

    let mut run = BatchRun::new(
        Arc::new(store.clone()),
        Box::new(DeleteAll),
        run_options("purge-logs", "logs", 10, 10, ScanMode::Requery),
    )
    .with_shutdown(shutdown);
    let err = run.run().await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::RUN_CANCELLED);
    assert_eq!(err.exit_code(), 130);
    assert_eq!(store.count("logs").await, 5);
}
