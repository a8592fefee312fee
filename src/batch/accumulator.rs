//! Batch accumulator
//!
//! Collects operations until the batch is full and commits it before
//! `add` returns, so the pending batch never holds more than
//! `max_batch_size` operations.

use super::executor::{CommitExecutor, CommitReport};
use crate::error::BatchResult;
use crate::store::Operation;

pub struct BatchAccumulator {
    max_batch_size: usize,
    pending: Vec<Operation>,
    executor: CommitExecutor,
}

impl BatchAccumulator {
    /// `max_batch_size` must be positive; configuration validation
    /// guarantees it for real runs.
    pub fn new(max_batch_size: usize, executor: CommitExecutor) -> Self {
        let max_batch_size = max_batch_size.max(1);
        Self {
            max_batch_size,
            pending: Vec::with_capacity(max_batch_size),
            executor,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queue one operation, committing the batch if it is now full
    pub async fn add(&mut self, operation: Operation) -> BatchResult<Option<CommitReport>> {
        self.pending.push(operation);
        if self.pending.len() < self.max_batch_size {
            return Ok(None);
        }
        self.flush().await.map(Some)
    }

    /// Commit whatever is pending; an empty batch is never sent
    pub async fn flush_remainder(&mut self) -> BatchResult<Option<CommitReport>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        self.flush().await.map(Some)
    }

    /// The pending batch is dropped whether or not the commit succeeds: a
    /// failed batch is reported, not retried by the accumulator.
    async fn flush(&mut self) -> BatchResult<CommitReport> {
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.max_batch_size));
        self.executor.commit(&batch).await
    }
}
