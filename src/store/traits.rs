//! Core trait definitions for document store clients

use async_trait::async_trait;

use super::error::StoreResult;
use super::types::{Cursor, DocumentRef, Page};
use super::value::FieldMap;

/// Client for a remote document store
///
/// Implementations must return documents in a stable order (both shipped
/// backends order by document id) so that cursor paging visits every
/// document exactly once.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch up to `limit` documents, starting after `cursor` when given.
    ///
    /// An empty page means no further documents exist.
    async fn query(
        &self,
        collection: &str,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Page>;

    /// Open a write batch whose operations are committed together
    fn batch_writer(&self) -> Box<dyn BatchWriter>;

    /// Verify the store is reachable and the caller is authorized
    async fn health_check(&self) -> StoreResult<()>;

    /// Backend name for log lines
    fn backend_name(&self) -> &'static str;
}

/// Pending set of writes, applied all-or-nothing on `commit`
#[async_trait]
pub trait BatchWriter: Send {
    fn delete(&mut self, target: DocumentRef);

    fn update(&mut self, target: DocumentRef, fields: FieldMap);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every staged write or none of them
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
