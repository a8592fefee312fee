//! Resumable run checkpoints
//!
//! After every fully committed page of a cursor scan the controller records
//! where the scan stood. A later run with `--resume` starts after that
//! position instead of rescanning the collection from the beginning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::{BatchError, BatchResult, ErrorCode};
use crate::store::Cursor;

/// Saved progress of a cursor scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCheckpoint {
    pub run_id: Uuid,
    pub job: String,
    pub collection: String,
    /// Last document id whose page was fully committed
    pub cursor: Option<Cursor>,
    pub batches_committed: usize,
    pub documents_affected: usize,
    pub updated_at: DateTime<Utc>,
}

impl RunCheckpoint {
    pub fn new(run_id: Uuid, job: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            run_id,
            job: job.into(),
            collection: collection.into(),
            cursor: None,
            batches_committed: 0,
            documents_affected: 0,
            updated_at: Utc::now(),
        }
    }
}

/// File-backed checkpoint store, one file per (job, collection)
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    base_dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, job: &str, collection: &str) -> PathBuf {
        self.base_dir
            .join(format!("{job}-{collection}.checkpoint.json"))
    }

    /// Write the checkpoint through a temp file and a rename
    pub async fn save(&self, checkpoint: &RunCheckpoint) -> BatchResult<()> {
        let path = self.path_for(&checkpoint.job, &checkpoint.collection);
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| io_error("create checkpoint directory", &self.base_dir, e))?;

        let json = serde_json::to_vec_pretty(checkpoint).map_err(|e| {
            BatchError::checkpoint_with_source(
                ErrorCode::CHECKPOINT_GENERIC,
                "failed to serialize checkpoint",
                e,
            )
        })?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &json)
            .await
            .map_err(|e| io_error("write checkpoint", &temp_path, e))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| io_error("replace checkpoint", &path, e))?;

        debug!(
            "Saved checkpoint for {} on '{}' at {:?}",
            checkpoint.job, checkpoint.collection, checkpoint.cursor
        );
        Ok(())
    }

    /// Load the checkpoint for a job, if one exists
    pub async fn load(&self, job: &str, collection: &str) -> BatchResult<Option<RunCheckpoint>> {
        let path = self.path_for(job, collection);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read checkpoint", &path, e)),
        };

        let checkpoint: RunCheckpoint = serde_json::from_slice(&data).map_err(|e| {
            BatchError::checkpoint_with_source(
                ErrorCode::CHECKPOINT_CORRUPTED,
                format!("{} is not a valid checkpoint", path.display()),
                e,
            )
        })?;

        if checkpoint.job != job || checkpoint.collection != collection {
            return Err(BatchError::checkpoint(
                ErrorCode::CHECKPOINT_MISMATCH,
                format!(
                    "{} belongs to {} on '{}'",
                    path.display(),
                    checkpoint.job,
                    checkpoint.collection
                ),
            ));
        }

        Ok(Some(checkpoint))
    }

    /// Remove the checkpoint once a run has completed
    pub async fn clear(&self, job: &str, collection: &str) -> BatchResult<()> {
        let path = self.path_for(job, collection);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove checkpoint", &path, e)),
        }
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> BatchError {
    BatchError::checkpoint_with_source(
        ErrorCode::CHECKPOINT_IO_ERROR,
        format!("failed to {action} {}", path.display()),
        err,
    )
}
