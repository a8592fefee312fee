//! Commit executor
//!
//! Turns one batch of operations into one store write batch and commits it
//! as a unit. Batches are numbered from 1 in the order they are handed in,
//! so a failure can always be tied back to a logical batch.

use std::sync::Arc;
use tracing::{debug, error};

use super::retry::RetryExecutor;
use super::signals::ShutdownSignal;
use crate::error::{BatchError, BatchResult};
use crate::store::{DocumentStore, Operation};

/// What a successful commit applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    /// 1-based batch number within the run
    pub batch: usize,
    pub deletes: usize,
    pub updates: usize,
    pub dry_run: bool,
}

impl CommitReport {
    pub fn size(&self) -> usize {
        self.deletes + self.updates
    }
}

pub struct CommitExecutor {
    store: Arc<dyn DocumentStore>,
    retry: RetryExecutor,
    shutdown: ShutdownSignal,
    dry_run: bool,
    batches_started: usize,
}

impl CommitExecutor {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryExecutor) -> Self {
        Self {
            store,
            retry,
            shutdown: ShutdownSignal::new(),
            dry_run: false,
            batches_started: 0,
        }
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Log batches instead of writing them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Continue batch numbering after batches committed by an earlier run
    pub fn starting_after(mut self, batches_committed: usize) -> Self {
        self.batches_started = batches_committed;
        self
    }

    pub fn batches_started(&self) -> usize {
        self.batches_started
    }

    /// Apply every operation of the batch or none of them
    pub async fn commit(&mut self, operations: &[Operation]) -> BatchResult<CommitReport> {
        if self.shutdown.is_shutdown_requested() {
            return Err(BatchError::cancelled(format!(
                "before committing batch {}",
                self.batches_started + 1
            )));
        }

        self.batches_started += 1;
        let batch = self.batches_started;
        let deletes = operations.iter().filter(|op| op.is_delete()).count();
        let report = CommitReport {
            batch,
            deletes,
            updates: operations.len() - deletes,
            dry_run: self.dry_run,
        };

        if self.dry_run {
            for op in operations {
                debug!("[dry run] batch {}: {}", batch, op);
            }
            return Ok(report);
        }

        let store = &self.store;
        let context = format!("commit of batch {batch}");
        self.retry
            .execute(
                || {
                    let mut writer = store.batch_writer();
                    for op in operations {
                        match op {
                            Operation::Delete(target) => writer.delete(target.clone()),
                            Operation::Update { target, fields } => {
                                writer.update(target.clone(), fields.clone())
                            }
                        }
                    }
                    writer.commit()
                },
                &context,
            )
            .await
            .map_err(|e| {
                error!(
                    "Batch {} ({} operations) was not applied: {}",
                    batch,
                    operations.len(),
                    e
                );
                BatchError::commit(batch, operations.len(), e)
            })?;

        debug!(
            "Committed batch {} ({} deletes, {} updates)",
            batch, report.deletes, report.updates
        );
        Ok(report)
    }
}
