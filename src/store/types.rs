//! Document, page and operation types shared by stores and the batch engine

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::{FieldMap, Value};

/// Reference to a single document within a named collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Read-only snapshot of a stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub reference: DocumentRef,
    pub fields: FieldMap,
}

impl Document {
    pub fn new(reference: DocumentRef, fields: FieldMap) -> Self {
        Self { reference, fields }
    }

    pub fn id(&self) -> &str {
        &self.reference.id
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Builder-style setter, mostly for fixtures
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Opaque scan position: the id of the last document already returned
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn after(doc: &Document) -> Self {
        Self(doc.id().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of query results
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub documents: Vec<Document>,
    pub next_cursor: Option<Cursor>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// A single store mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Delete(DocumentRef),
    Update {
        target: DocumentRef,
        fields: FieldMap,
    },
}

impl Operation {
    pub fn target(&self) -> &DocumentRef {
        match self {
            Operation::Delete(target) => target,
            Operation::Update { target, .. } => target,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete(_))
    }

    /// Merge an update's fields into a document snapshot.
    ///
    /// Deletes have no effect on a snapshot; callers remove the document
    /// itself.
    pub fn apply_to(&self, doc: &mut Document) {
        if let Operation::Update { fields, .. } = self {
            for (name, value) in fields {
                doc.fields.insert(name.clone(), value.clone());
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Delete(target) => write!(f, "delete {target}"),
            Operation::Update { target, fields } => {
                let names: Vec<&str> = fields.keys().map(String::as_str).collect();
                write!(f, "update {target} [{}]", names.join(", "))
            }
        }
    }
}
