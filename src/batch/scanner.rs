//! Page scanner
//!
//! Wraps [`DocumentStore::query`] with the scan mode, cursor bookkeeping,
//! timeout and retry. An empty page is the only way a scan ends; store
//! failures come back as [`BatchError::Scan`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use super::retry::RetryExecutor;
use crate::error::{BatchError, BatchResult};
use crate::store::{Cursor, Document, DocumentStore};

/// How consecutive pages are requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Always ask for the first N documents. Only terminates when each
    /// page's documents are removed before the next fetch.
    Requery,
    /// Continue after the last document of the previous page
    Cursor,
}

pub struct PageScanner {
    store: Arc<dyn DocumentStore>,
    collection: String,
    page_size: usize,
    mode: ScanMode,
    cursor: Option<Cursor>,
    retry: RetryExecutor,
    pages_fetched: usize,
}

impl PageScanner {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        page_size: usize,
        mode: ScanMode,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            page_size,
            mode,
            cursor: None,
            retry,
            pages_fetched: 0,
        }
    }

    /// Start after a previously saved position (cursor mode only)
    pub fn resume_from(mut self, cursor: Option<Cursor>) -> Self {
        if self.mode == ScanMode::Cursor {
            self.cursor = cursor;
        }
        self
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page; empty means the scan is complete
    pub async fn next_page(&mut self) -> BatchResult<Vec<Document>> {
        let page_number = self.pages_fetched + 1;
        let cursor = match self.mode {
            ScanMode::Requery => None,
            ScanMode::Cursor => self.cursor.clone(),
        };
        trace!(
            "Fetching page {} of '{}' (limit {}, cursor {:?})",
            page_number,
            self.collection,
            self.page_size,
            cursor
        );

        let store = &self.store;
        let collection = self.collection.as_str();
        let page_size = self.page_size;
        let context = format!("query of '{collection}' page {page_number}");
        let page = self
            .retry
            .execute(
                || store.query(collection, page_size, cursor.as_ref()),
                &context,
            )
            .await
            .map_err(|e| BatchError::scan(collection, page_number, e))?;

        self.pages_fetched = page_number;

        if page.documents.is_empty() {
            debug!("Page {} of '{}' is empty", page_number, self.collection);
            return Ok(page.documents);
        }

        if self.mode == ScanMode::Cursor {
            self.cursor = page
                .next_cursor
                .or_else(|| page.documents.last().map(Cursor::after));
        }
        debug!(
            "Fetched page {} of '{}' with {} documents",
            page_number,
            self.collection,
            page.documents.len()
        );
        Ok(page.documents)
    }
}
