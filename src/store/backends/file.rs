//! File-based document store
//!
//! Each collection lives in `<base_dir>/<collection>.json` as a JSON object
//! keyed by document id. A commit rewrites the collection file through a
//! temp file and a rename, so readers see either the old or the new file.
//! The write lock is held until the rename finishes, even when the caller
//! stops waiting on the commit.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, trace};

use crate::store::{
    error::{StoreError, StoreResult},
    traits::{BatchWriter, DocumentStore},
    types::{Cursor, Document, DocumentRef, Operation, Page},
    value::FieldMap,
    MAX_BATCH_WRITES,
};

type CollectionData = BTreeMap<String, FieldMap>;

/// File-based store backend
pub struct FileStore {
    base_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Create a file store rooted at `base_dir`, creating the directory
    pub async fn new(base_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await?;
        Ok(Self {
            base_dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Replace a whole collection, used to seed data
    pub async fn write_collection(
        &self,
        collection: &str,
        docs: impl IntoIterator<Item = Document>,
    ) -> StoreResult<()> {
        let path = collection_path(&self.base_dir, collection)?;
        let data: CollectionData = docs
            .into_iter()
            .map(|doc| (doc.reference.id, doc.fields))
            .collect();
        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        write_atomic(guard, path, &data).await
    }
}

fn collection_path(base_dir: &Path, collection: &str) -> StoreResult<PathBuf> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(StoreError::invalid_argument(format!(
            "invalid collection name: {collection:?}"
        )));
    }
    Ok(base_dir.join(format!("{collection}.json")))
}

async fn read_collection(path: &Path) -> StoreResult<CollectionData> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CollectionData::new()),
        Err(e) => Err(StoreError::Io(e)),
    }
}

/// Write and rename on a blocking thread that owns the lock guard, so a
/// dropped commit future cannot leave a half-written temp file behind for
/// the next writer.
async fn write_atomic(
    guard: OwnedMutexGuard<()>,
    path: PathBuf,
    data: &CollectionData,
) -> StoreResult<()> {
    let content = serde_json::to_vec_pretty(data)?;
    let count = data.len();
    let task = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &path)?;
        Ok::<_, std::io::Error>(path)
    });
    let path = task
        .await
        .map_err(|e| StoreError::Other(anyhow::anyhow!("file write task failed: {e}")))??;
    trace!("Wrote {} documents to {}", count, path.display());
    Ok(())
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn query(
        &self,
        collection: &str,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> StoreResult<Page> {
        if limit == 0 {
            return Err(StoreError::invalid_argument("query limit must be positive"));
        }
        let path = collection_path(&self.base_dir, collection)?;
        let data = read_collection(&path).await?;

        let lower = match cursor {
            Some(c) => Bound::Excluded(c.as_str().to_string()),
            None => Bound::Unbounded,
        };
        let documents: Vec<Document> = data
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
        Box::new(FileBatchWriter {
            base_dir: self.base_dir.clone(),
            write_lock: Arc::clone(&self.write_lock),
            operations: Vec::new(),
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        let metadata = fs::metadata(&self.base_dir).await?;
        if !metadata.is_dir() {
            return Err(StoreError::invalid_argument(format!(
                "{} is not a directory",
                self.base_dir.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(StoreError::permission_denied(format!(
                "{} is read-only",
                self.base_dir.display()
            )));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

struct FileBatchWriter {
    base_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
    operations: Vec<Operation>,
}

#[async_trait]
impl BatchWriter for FileBatchWriter {
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
        let Some(first) = self.operations.first() else {
            return Ok(());
        };
        if self.operations.len() > MAX_BATCH_WRITES {
            return Err(StoreError::invalid_argument(format!(
                "batch of {} writes exceeds the limit of {}",
                self.operations.len(),
                MAX_BATCH_WRITES
            )));
        }

        // One file per collection, so a single rename is only atomic for
        // single-collection batches.
        let collection = first.target().collection.clone();
        if let Some(other) = self
            .operations
            .iter()
            .find(|op| op.target().collection != collection)
        {
            return Err(StoreError::invalid_argument(format!(
                "file store batches must target one collection, found {} and {}",
                collection,
                other.target().collection
            )));
        }

        let path = collection_path(&self.base_dir, &collection)?;
        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        let mut data = read_collection(&path).await?;

        for op in &self.operations {
            match op {
                Operation::Delete(target) => {
                    data.remove(&target.id);
                }
                Operation::Update { target, fields } => {
                    let existing = data
                        .get_mut(&target.id)
                        .ok_or_else(|| StoreError::not_found(target))?;
                    for (name, value) in fields {
                        existing.insert(name.clone(), value.clone());
                    }
                }
            }
        }

        write_atomic(guard, path.clone(), &data).await?;
        debug!(
            "Committed {} writes to {}",
            self.operations.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::value::Value;
    use std::time::Duration;
    use tempfile::TempDir;

    fn member(id: &str, company: Option<&str>) -> Document {
        let doc = Document::new(DocumentRef::new("members", id), FieldMap::new())
            .with_field("name", id);
        match company {
            Some(c) => doc.with_field("company", c),
            None => doc,
        }
    }

    #[tokio::test]
    async fn test_roundtrip_and_paging() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).await.unwrap();
        store
            .write_collection(
                "members",
                vec![member("m1", None), member("m2", Some("Acme")), member("m3", None)],
            )
            .await
            .unwrap();

        let page = store.query("members", 2, None).await.unwrap();
        assert_eq!(page.documents.len(), 2);
        assert_eq!(page.next_cursor, Some(Cursor("m2".to_string())));

        let page = store
            .query("members", 2, page.next_cursor.as_ref())
            .await
            .unwrap();
        assert_eq!(page.documents.len(), 1);
        assert_eq!(page.documents[0].id(), "m3");
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).await.unwrap();
        store
            .write_collection("members", vec![member("m1", None)])
            .await
            .unwrap();

        let mut fields = FieldMap::new();
        fields.insert("company".to_string(), Value::from("N/A"));
        let mut writer = store.batch_writer();
        writer.update(DocumentRef::new("members", "m1"), fields.clone());
        writer.update(DocumentRef::new("members", "missing"), fields);
        assert!(writer.commit().await.unwrap_err().is_not_found());

        let page = store.query("members", 10, None).await.unwrap();
        assert_eq!(page.documents[0].get("company"), None);
    }

    #[tokio::test]
    async fn test_abandoned_commits_leave_a_readable_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).await.unwrap();
        let docs: Vec<Document> = (0..20).map(|i| member(&format!("m{i:02}"), None)).collect();
        store.write_collection("members", docs).await.unwrap();

        for i in 0..10u64 {
            let mut writer = store.batch_writer();
            writer.delete(DocumentRef::new("members", format!("m{i:02}")));
            let _ = tokio::time::timeout(Duration::from_micros(i * 50), writer.commit()).await;
        }

        let mut writer = store.batch_writer();
        writer.delete(DocumentRef::new("members", "m15"));
        writer.commit().await.unwrap();

        assert!(!temp_dir.path().join("members.json.tmp").exists());
        let page = store.query("members", 100, None).await.unwrap();
        let ids: Vec<&str> = page.documents.iter().map(|d| d.id()).collect();
        assert!(!ids.contains(&"m15"));
        for untouched in ["m10", "m11", "m12", "m13", "m14", "m16", "m17", "m18", "m19"] {
            assert!(ids.contains(&untouched), "{untouched} missing");
        }
    }

    #[tokio::test]
    async fn test_rejects_path_like_collection_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).await.unwrap();
        let err = store.query("../etc", 10, None).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_rejects_mixed_collection_batch() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).await.unwrap();
        let mut writer = store.batch_writer();
        writer.delete(DocumentRef::new("logs", "a"));
        writer.delete(DocumentRef::new("members", "b"));
        let err = writer.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }
}
