//! Store factory for creating store clients

use std::sync::Arc;
use tracing::debug;

use super::backends::{FileStore, MemoryStore};
use super::config::{BackendType, StoreConfig};
use super::error::StoreResult;
use super::traits::DocumentStore;

/// Factory for creating store instances
pub struct StoreFactory;

impl StoreFactory {
    /// Create a store client from explicit configuration
    pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
        match config.backend {
            BackendType::File => {
                debug!("Opening file store at {}", config.base_dir.display());
                let store = FileStore::new(&config.base_dir).await?;
                Ok(Arc::new(store))
            }
            BackendType::Memory => Ok(Arc::new(MemoryStore::new())),
        }
    }
}
