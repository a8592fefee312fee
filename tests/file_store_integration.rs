//! Batch runs against the JSON file backend

mod common;

use common::*;
use docbatch::batch::{BackfillDefault, BatchRun, DeleteAll, NormalizeDates, ScanMode};
use docbatch::store::{DocumentStore, FileStore, Value};
use std::sync::Arc;

#[tokio::test]
async fn test_purge_empties_collection_file() {
    let fixture = FileFixture::new().await;
    fixture
        .store
        .write_collection("logs", (0..7).map(log_entry))
        .await
        .unwrap();

    let store: Arc<dyn DocumentStore> = Arc::new(FileStore::new(fixture.data_dir()).await.unwrap());
    let summary = BatchRun::new(
        Arc::clone(&store),
        Box::new(DeleteAll),
        run_options("purge-logs", "logs", 3, 3, ScanMode::Requery),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.documents_affected, 7);
    assert_eq!(summary.batches_committed, 3);
    assert!(store.query("logs", 10, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_migration_persists_timestamps() {
    let fixture = FileFixture::new().await;
    fixture
        .store
        .write_collection(
            "agreements",
            [
                agreement(
                    "a1",
                    &[
                        ("startDate", Value::from("2024-01-15")),
                        ("agreementDate", Value::from("15/01/2024")),
                    ],
                ),
                agreement("a2", &[("endDate", Value::from("2024-12-31"))]),
                agreement("a3", &[("title", Value::from("no dates"))]),
            ],
        )
        .await
        .unwrap();

    let summary = BatchRun::new(
        Arc::new(FileStore::new(fixture.data_dir()).await.unwrap()),
        Box::new(NormalizeDates::default()),
        run_options("migrate-dates", "agreements", 2, 500, ScanMode::Cursor),
    )
    .run()
    .await
    .unwrap();
    assert_eq!(summary.operations_queued, 2);

    // Reopen to read what is on disk.
    let reopened = FileStore::new(fixture.data_dir()).await.unwrap();
    let page = reopened.query("agreements", 10, None).await.unwrap();
    let a1 = &page.documents[0];
    assert_eq!(a1.get("startDate"), Some(&midnight_utc(2024, 1, 15)));
    assert_eq!(a1.get("agreementDate"), Some(&Value::from("15/01/2024")));
    assert_eq!(page.documents[1].get("endDate"), Some(&midnight_utc(2024, 12, 31)));
    assert_eq!(page.documents[2].get("startDate"), None);
}

#[tokio::test]
async fn test_backfill_treats_empty_and_null_as_missing() {
    let fixture = FileFixture::new().await;
    fixture
        .store
        .write_collection(
            "members",
            [
                member(0, None),
                member(1, Some("")),
                member(2, Some("Initech")),
                member(3, None).with_field("company", Value::Null),
            ],
        )
        .await
        .unwrap();

    let store = Arc::new(FileStore::new(fixture.data_dir()).await.unwrap());
    let summary = BatchRun::new(
        store.clone(),
        Box::new(BackfillDefault::new("company", "N/A")),
        run_options("backfill-company", "members", 10, 10, ScanMode::Cursor),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.documents_affected, 3);
    let page = store.query("members", 10, None).await.unwrap();
    let companies: Vec<_> = page
        .documents
        .iter()
        .map(|d| d.get("company").cloned())
        .collect();
    assert_eq!(
        companies,
        vec![
            Some(Value::from("N/A")),
            Some(Value::from("N/A")),
            Some(Value::from("Initech")),
            Some(Value::from("N/A")),
        ]
    );
}
