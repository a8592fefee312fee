//! Job configuration
//!
//! A [`JobConfig`] starts from the preset of a [`JobKind`], then is layered
//! with an optional TOML file, `DOCBATCH_*` environment variables and
//! finally command-line flags. [`JobConfig::validate`] runs last.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::batch::{PolicySpec, RetryConfig, ScanMode};
use crate::error::{BatchError, BatchResult, ErrorCode};
use crate::store::{StoreConfig, MAX_BATCH_WRITES};

pub mod loader;

pub use loader::{ConfigLoader, JobFile};

/// Built-in maintenance jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Delete every document of the log collection
    PurgeLogs,
    /// Convert `YYYY-MM-DD` strings on agreements to timestamps
    MigrateDates,
    /// Fill a missing `company` on members with "N/A"
    BackfillCompany,
}

impl JobKind {
    pub fn name(self) -> &'static str {
        match self {
            JobKind::PurgeLogs => "purge-logs",
            JobKind::MigrateDates => "migrate-dates",
            JobKind::BackfillCompany => "backfill-company",
        }
    }

    pub fn default_collection(self) -> &'static str {
        match self {
            JobKind::PurgeLogs => "logs",
            JobKind::MigrateDates => "agreements",
            JobKind::BackfillCompany => "members",
        }
    }

    pub fn default_policy(self) -> PolicySpec {
        match self {
            JobKind::PurgeLogs => PolicySpec::DeleteAll,
            JobKind::MigrateDates => PolicySpec::NormalizeDates {
                fields: vec![
                    "startDate".to_string(),
                    "endDate".to_string(),
                    "agreementDate".to_string(),
                ],
            },
            JobKind::BackfillCompany => PolicySpec::BackfillDefault {
                field: "company".to_string(),
                value: "N/A".to_string(),
            },
        }
    }

    /// Purging re-reads the first page because deleted documents drop out;
    /// the others walk the collection with a cursor.
    pub fn preset(self) -> JobConfig {
        let (scan_mode, max_batch_size) = match self {
            JobKind::PurgeLogs => (ScanMode::Requery, 100),
            JobKind::MigrateDates | JobKind::BackfillCompany => (ScanMode::Cursor, 500),
        };
        JobConfig {
            job: self,
            collection: self.default_collection().to_string(),
            page_size: max_batch_size,
            max_batch_size,
            scan_mode,
            dry_run: false,
            policy: None,
            store: StoreConfig::default(),
            retry: RetryConfig::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JobKind {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purge-logs" => Ok(JobKind::PurgeLogs),
            "migrate-dates" => Ok(JobKind::MigrateDates),
            "backfill-company" => Ok(JobKind::BackfillCompany),
            other => Err(BatchError::config(format!("unknown job '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_enabled")]
    pub enabled: bool,

    #[serde(default = "default_checkpoint_path")]
    pub path: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: default_checkpoint_enabled(),
            path: default_checkpoint_path(),
        }
    }
}

fn default_checkpoint_enabled() -> bool {
    true
}

fn default_checkpoint_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".docbatch").join("checkpoints"))
        .unwrap_or_else(|| PathBuf::from(".docbatch/checkpoints"))
}

/// Fully resolved settings of one job run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobConfig {
    pub job: JobKind,
    pub collection: String,
    pub page_size: usize,
    pub max_batch_size: usize,
    pub scan_mode: ScanMode,
    pub dry_run: bool,
    /// Replaces the job's default policy when set
    pub policy: Option<PolicySpec>,
    pub store: StoreConfig,
    pub retry: RetryConfig,
    pub checkpoint: CheckpointConfig,
}

/// Values given on the command line; `None` leaves the config untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobOverrides {
    pub collection: Option<String>,
    pub page_size: Option<usize>,
    pub max_batch_size: Option<usize>,
    pub store_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl JobConfig {
    pub fn policy_spec(&self) -> PolicySpec {
        self.policy
            .clone()
            .unwrap_or_else(|| self.job.default_policy())
    }

    /// Layer a parsed config file over this config
    pub fn merge_file(&mut self, file: JobFile) {
        if let Some(collection) = file.collection {
            self.collection = collection;
        }
        if let Some(page_size) = file.page_size {
            self.page_size = page_size;
        }
        if let Some(max_batch_size) = file.max_batch_size {
            self.max_batch_size = max_batch_size;
        }
        if let Some(scan_mode) = file.scan_mode {
            self.scan_mode = scan_mode;
        }
        if let Some(dry_run) = file.dry_run {
            self.dry_run = dry_run;
        }
        if file.policy.is_some() {
            self.policy = file.policy;
        }
        if let Some(store) = file.store {
            self.store = store;
        }
        if let Some(retry) = file.retry {
            self.retry = retry;
        }
        if let Some(checkpoint) = file.checkpoint {
            self.checkpoint = checkpoint;
        }
        self.store.base_dir = expand_home(&self.store.base_dir);
        self.checkpoint.path = expand_home(&self.checkpoint.path);
    }

    pub fn merge_env_vars(&mut self) -> BatchResult<()> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `DOCBATCH_*` variables read through `lookup`
    pub fn merge_env_from<F>(&mut self, lookup: F) -> BatchResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("DOCBATCH_STORE_DIR") {
            self.store.base_dir = expand_home(Path::new(&dir));
        }
        if let Some(size) = lookup("DOCBATCH_BATCH_SIZE") {
            self.max_batch_size = parse_env_number("DOCBATCH_BATCH_SIZE", &size)?;
        }
        if let Some(size) = lookup("DOCBATCH_PAGE_SIZE") {
            self.page_size = parse_env_number("DOCBATCH_PAGE_SIZE", &size)?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &JobOverrides) {
        if let Some(collection) = &overrides.collection {
            self.collection = collection.clone();
        }
        if let Some(page_size) = overrides.page_size {
            self.page_size = page_size;
        }
        if let Some(max_batch_size) = overrides.max_batch_size {
            self.max_batch_size = max_batch_size;
        }
        if let Some(dir) = &overrides.store_dir {
            self.store.base_dir = dir.clone();
        }
        if overrides.dry_run {
            self.dry_run = true;
        }
    }

    pub fn validate(&self) -> BatchResult<()> {
        if self.collection.trim().is_empty() {
            return Err(BatchError::config("collection name must not be empty"));
        }
        if self.page_size == 0 {
            return Err(BatchError::config("page_size must be positive"));
        }
        if self.max_batch_size == 0 {
            return Err(BatchError::config("max_batch_size must be positive"));
        }
        if self.max_batch_size > MAX_BATCH_WRITES {
            return Err(BatchError::config(format!(
                "max_batch_size {} exceeds the store limit of {} writes per batch",
                self.max_batch_size, MAX_BATCH_WRITES
            )));
        }
        self.retry
            .validate()
            .map_err(|msg| BatchError::config(format!("retry: {msg}")))?;

        let policy = self.policy_spec();
        if let PolicySpec::NormalizeDates { fields } = &policy {
            if fields.is_empty() {
                return Err(BatchError::config(
                    "normalize_dates needs at least one field",
                ));
            }
        }
        if self.scan_mode == ScanMode::Requery && !policy.removes_documents() {
            return Err(BatchError::config(format!(
                "scan_mode = \"requery\" requires a policy that deletes documents; \
                 {} would never get past the first page",
                self.job
            )));
        }
        Ok(())
    }
}

fn parse_env_number(key: &str, raw: &str) -> BatchResult<usize> {
    raw.trim().parse().map_err(|_| {
        BatchError::config_with_code(
            ErrorCode::CONFIG_PARSE_ERROR,
            format!("{key} must be a non-negative integer, got '{raw}'"),
        )
    })
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
