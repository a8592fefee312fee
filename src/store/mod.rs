//! Document store abstraction
//!
//! The batch engine only talks to [`DocumentStore`]; which backend sits
//! behind it is decided once at startup by [`StoreFactory`].

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod traits;
pub mod types;
pub mod value;

pub use backends::{FaultKind, FileStore, MemoryStore};
pub use config::{BackendType, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use factory::StoreFactory;
pub use traits::{BatchWriter, DocumentStore};
pub use types::{Cursor, Document, DocumentRef, Operation, Page};
pub use value::{FieldMap, Value};

/// Largest number of writes a single atomic batch may carry
pub const MAX_BATCH_WRITES: usize = 500;
