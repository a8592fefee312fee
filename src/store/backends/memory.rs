//! In-memory document store for testing
//!
//! Besides holding documents, the memory backend records every commit it
//! sees and can be told to fail specific query or commit attempts, which is
//! how the engine's failure paths are exercised.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::{
    error::{StoreError, StoreResult},
    traits::{BatchWriter, DocumentStore},
    types::{Cursor, Document, DocumentRef, Operation, Page},
    value::FieldMap,
    MAX_BATCH_WRITES,
};

/// Kind of failure to inject into a query or commit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Unavailable,
    Connection,
    PermissionDenied,
    InvalidArgument,
}

impl FaultKind {
    fn to_error(self, what: &str) -> StoreError {
        match self {
            FaultKind::Unavailable => StoreError::unavailable(format!("injected fault on {what}")),
            FaultKind::Connection => StoreError::connection(format!("injected fault on {what}")),
            FaultKind::PermissionDenied => {
                StoreError::permission_denied(format!("injected fault on {what}"))
            }
            FaultKind::InvalidArgument => {
                StoreError::invalid_argument(format!("injected fault on {what}"))
            }
        }
    }
}

#[derive(Default)]
struct MemoryState {
    collections: HashMap<String, BTreeMap<String, FieldMap>>,
    query_attempts: usize,
    commit_attempts: usize,
    committed_batches: Vec<usize>,
    query_faults: HashMap<usize, FaultKind>,
    commit_faults: HashMap<usize, FaultKind>,
    health_fault: Option<FaultKind>,
}

/// In-memory store backend
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a document
    pub async fn insert(&self, doc: Document) {
        let mut state = self.state.write().await;
        state
            .collections
            .entry(doc.reference.collection.clone())
            .or_default()
            .insert(doc.reference.id.clone(), doc.fields);
    }

    pub async fn seed(&self, docs: impl IntoIterator<Item = Document>) {
        for doc in docs {
            self.insert(doc).await;
        }
    }

    pub async fn get(&self, collection: &str, id: &str) -> Option<Document> {
        let state = self.state.read().await;
        state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(DocumentRef::new(collection, id), fields.clone()))
    }

    pub async fn count(&self, collection: &str) -> usize {
        let state = self.state.read().await;
        state.collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// All documents of a collection, ordered by id
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        let state = self.state.read().await;
        state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| {
                        Document::new(DocumentRef::new(collection, id.as_str()), fields.clone())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sizes of successfully committed batches, in commit order
    pub async fn committed_batches(&self) -> Vec<usize> {
        self.state.read().await.committed_batches.clone()
    }

    pub async fn commit_attempts(&self) -> usize {
        self.state.read().await.commit_attempts
    }

    pub async fn query_attempts(&self) -> usize {
        self.state.read().await.query_attempts
    }

    /// Fail the n-th commit attempt (1-based, counting retries)
    pub async fn fail_commit_attempt(&self, attempt: usize, kind: FaultKind) {
        self.state.write().await.commit_faults.insert(attempt, kind);
    }

    /// Fail the n-th query attempt (1-based, counting retries)
    pub async fn fail_query_attempt(&self, attempt: usize, kind: FaultKind) {
        self.state.write().await.query_faults.insert(attempt, kind);
    }

    pub async fn set_health_fault(&self, kind: Option<FaultKind>) {
        self.state.write().await.health_fault = kind;
    }

    /// Forget recorded attempts and faults, keeping the documents
    pub async fn reset_counters(&self) {
        let mut state = self.state.write().await;
        state.query_attempts = 0;
        state.commit_attempts = 0;
        state.committed_batches.clear();
        state.query_faults.clear();
        state.commit_faults.clear();
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(
        &self,
        collection: &str,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Page> {
        if limit == 0 {
            return Err(StoreError::invalid_argument("query limit must be positive"));
        }

        let mut state = self.state.write().await;
        state.query_attempts += 1;
        let attempt = state.query_attempts;
        if let Some(kind) = state.query_faults.remove(&attempt) {
            return Err(kind.to_error(&format!("query #{attempt}")));
        }

        let Some(docs) = state.collections.get(collection) else {
            return Ok(Page::default());
        };

        let lower = match cursor {
            Some(c) => Bound::Excluded(c.as_str().to_string()),
            None => Bound::Unbounded,
        };
        let documents: Vec<Document> = docs
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(id, fields)| {
                Document::new(DocumentRef::new(collection, id.as_str()), fields.clone())
            })
            .collect();
        let next_cursor = documents.last().map(Cursor::after);

        Ok(Page {
            documents,
            next_cursor,
        })
    }

    fn batch_writer(&self) -> Box<dyn BatchWriter> {
        Box::new(MemoryBatchWriter {
            state: Arc::clone(&self.state),
            operations: Vec::new(),
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        match self.state.read().await.health_fault {
            Some(kind) => Err(kind.to_error("health check")),
            None => Ok(()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryBatchWriter {
    state: Arc<RwLock<MemoryState>>,
    operations: Vec<Operation>,
}

#[async_trait]
impl BatchWriter for MemoryBatchWriter {
    fn delete(&mut self, target: DocumentRef) {
        self.operations.push(Operation::Delete(target));
    }

    fn update(&mut self, target: DocumentRef, fields: FieldMap) {
        self.operations.push(Operation::Update { target, fields });
    }

    fn len(&self) -> usize {
        self.operations.len()
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.commit_attempts += 1;
        let attempt = state.commit_attempts;
        if let Some(kind) = state.commit_faults.remove(&attempt) {
            return Err(kind.to_error(&format!("commit #{attempt}")));
        }

        if self.operations.len() > MAX_BATCH_WRITES {
            return Err(StoreError::invalid_argument(format!(
                "batch of {} writes exceeds the limit of {}",
                self.operations.len(),
                MAX_BATCH_WRITES
            )));
        }

        // Validate everything before touching state so a rejected batch
        // leaves no trace.
        for op in &self.operations {
            if let Operation::Update { target, .. } = op {
                let exists = state
                    .collections
                    .get(&target.collection)
                    .is_some_and(|docs| docs.contains_key(&target.id));
                if !exists {
                    return Err(StoreError::not_found(target));
                }
            }
        }

        for op in &self.operations {
            match op {
                Operation::Delete(target) => {
                    if let Some(docs) = state.collections.get_mut(&target.collection) {
                        docs.remove(&target.id);
                    }
                }
                Operation::Update { target, fields } => {
                    if let Some(existing) = state
                        .collections
                        .get_mut(&target.collection)
                        .and_then(|docs| docs.get_mut(&target.id))
                    {
                        for (name, value) in fields {
                            existing.insert(name.clone(), value.clone());
                        }
                    }
                }
            }
        }

        let size = self.operations.len();
        state.committed_batches.push(size);
        Ok(())
    }
}
