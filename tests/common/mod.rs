//! Common test utilities and helpers

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use docbatch::batch::{BackoffStrategy, RetryConfig, RunOptions, ScanMode};
use docbatch::store::{Document, DocumentRef, FieldMap, FileStore, MemoryStore, Value};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Retry settings that keep tests fast
pub fn fast_retry(attempts: u32) -> RetryConfig {
    RetryConfig {
        attempts,
        backoff: BackoffStrategy::Fixed,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        jitter: false,
        ..RetryConfig::default()
    }
}

pub fn run_options(
    job: &str,
    collection: &str,
    page_size: usize,
    max_batch_size: usize,
    scan_mode: ScanMode,
) -> RunOptions {
    RunOptions {
        page_size,
        max_batch_size,
        scan_mode,
        retry: fast_retry(1),
        call_timeout: Duration::from_secs(5),
        ..RunOptions::new(job, collection)
    }
}

pub fn log_entry(i: usize) -> Document {
    Document::new(DocumentRef::new("logs", format!("log{i:05}")), FieldMap::new())
        .with_field("level", "info")
        .with_field("message", format!("entry {i}"))
}

pub fn agreement(id: &str, fields: &[(&str, Value)]) -> Document {
    fields.iter().fold(
        Document::new(DocumentRef::new("agreements", id), FieldMap::new()),
        |doc, (name, value)| doc.with_field(*name, value.clone()),
    )
}

/// A member whose `company` is set only when `company` is `Some`
pub fn member(i: usize, company: Option<&str>) -> Document {
    let doc = Document::new(DocumentRef::new("members", format!("m{i:05}")), FieldMap::new())
        .with_field("name", format!("Member {i}"));
    match company {
        Some(company) => doc.with_field("company", company),
        None => doc,
    }
}

pub fn midnight_utc(year: i32, month: u32, day: u32) -> Value {
    Value::Timestamp(Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap())
}

pub async fn memory_store_with(docs: impl IntoIterator<Item = Document>) -> MemoryStore {
    let store = MemoryStore::new();
    store.seed(docs).await;
    store
}

/// Temporary file store with its data directory
pub struct FileFixture {
    pub temp_dir: TempDir,
    pub store: FileStore,
}

impl FileFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("data")).await.unwrap();
        Self { temp_dir, store }
    }

    pub fn data_dir(&self) -> &Path {
        self.store.base_dir()
    }

    pub fn checkpoint_dir(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("checkpoints")
    }
}
