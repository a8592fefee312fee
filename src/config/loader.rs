use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::{CheckpointConfig, JobConfig, JobKind, JobOverrides};
use crate::batch::{PolicySpec, RetryConfig, ScanMode};
use crate::error::{BatchError, BatchResult, ErrorCode};
use crate::store::StoreConfig;

/// Contents of a TOML job file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    pub job: Option<JobKind>,
    pub collection: Option<String>,
    pub page_size: Option<usize>,
    pub max_batch_size: Option<usize>,
    pub scan_mode: Option<ScanMode>,
    pub dry_run: Option<bool>,
    pub policy: Option<PolicySpec>,
    pub store: Option<StoreConfig>,
    pub retry: Option<RetryConfig>,
    pub checkpoint: Option<CheckpointConfig>,
}

impl JobFile {
    pub fn parse(content: &str, origin: &Path) -> BatchResult<Self> {
        toml::from_str(content).map_err(|e| {
            BatchError::config_with_code(
                ErrorCode::CONFIG_PARSE_ERROR,
                format!("{}: {}", origin.display(), e.message()),
            )
        })
    }
}

/// Resolves a [`JobConfig`] from preset, file, environment and flags
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    use_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            use_env: true,
        }
    }

    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Skip `DOCBATCH_*` variables
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub async fn read_file(path: &Path) -> BatchResult<JobFile> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            let code = if e.kind() == std::io::ErrorKind::NotFound {
                ErrorCode::CONFIG_NOT_FOUND
            } else {
                ErrorCode::CONFIG_GENERIC
            };
            BatchError::config_with_code(code, format!("cannot read {}: {}", path.display(), e))
        })?;
        JobFile::parse(&content, path)
    }

    /// Build the config for `job`, or for the job named in the file when
    /// `job` is `None`.
    pub async fn load(
        &self,
        job: Option<JobKind>,
        overrides: &JobOverrides,
    ) -> BatchResult<JobConfig> {
        let file = match &self.config_path {
            Some(path) => {
                debug!("Loading job configuration from {}", path.display());
                Some(Self::read_file(path).await?)
            }
            None => None,
        };

        let file_job = file.as_ref().and_then(|f| f.job);
        let job = match (job, file_job) {
            (Some(requested), Some(named)) if requested != named => {
                return Err(BatchError::config(format!(
                    "config file describes job {named}, but {requested} was requested"
                )));
            }
            (Some(requested), _) => requested,
            (None, Some(named)) => named,
            (None, None) => {
                return Err(BatchError::config(
                    "no job given; name one in the config file with `job = \"...\"`",
                ));
            }
        };

        let mut config = job.preset();
        if let Some(file) = file {
            config.merge_file(file);
        }
        if self.use_env {
            config.merge_env_vars()?;
        }
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }
}
