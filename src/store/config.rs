//! Store configuration types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Store backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// One JSON file per collection (default)
    #[default]
    File,
    /// Process-local memory, empty at startup
    Memory,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::File => write!(f, "file"),
            BackendType::Memory => write!(f, "memory"),
        }
    }
}

/// Store connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendType,

    /// Data directory for the file backend
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Upper bound for any single query or commit round trip
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            base_dir: default_base_dir(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".docbatch").join("data"))
        .unwrap_or_else(|| PathBuf::from(".docbatch/data"))
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
