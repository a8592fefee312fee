//! Run controller
//!
//! Drives scan → decide → accumulate → commit until a page comes back
//! empty. Everything is sequential: the next page is only fetched after
//! the current page's operations have been committed.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::accumulator::BatchAccumulator;
use super::checkpoint::{CheckpointStore, RunCheckpoint};
use super::executor::{CommitExecutor, CommitReport};
use super::policy::{decide_page, MutationPolicy};
use super::retry::{RetryConfig, RetryExecutor};
use super::scanner::{PageScanner, ScanMode};
use super::signals::ShutdownSignal;
use super::state::{RunPhase, RunState, RunSummary};
use crate::error::{BatchError, BatchResult};
use crate::store::{Cursor, DocumentStore, MAX_BATCH_WRITES};

/// Parameters of a single run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Job name used in logs, summaries and checkpoint file names
    pub job: String,
    pub collection: String,
    pub page_size: usize,
    pub max_batch_size: usize,
    pub scan_mode: ScanMode,
    pub dry_run: bool,
    pub retry: RetryConfig,
    pub call_timeout: Duration,
}

impl RunOptions {
    pub fn new(job: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            collection: collection.into(),
            page_size: 500,
            max_batch_size: 500,
            scan_mode: ScanMode::Cursor,
            dry_run: false,
            retry: RetryConfig::default(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

pub struct BatchRun {
    store: Arc<dyn DocumentStore>,
    policy: Box<dyn MutationPolicy>,
    options: RunOptions,
    shutdown: ShutdownSignal,
    checkpoints: Option<CheckpointStore>,
    resume: bool,
    run_id: Uuid,
    state: RunState,
}

impl BatchRun {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        policy: Box<dyn MutationPolicy>,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            policy,
            options,
            shutdown: ShutdownSignal::new(),
            checkpoints: None,
            resume: false,
            run_id: Uuid::new_v4(),
            state: RunState::default(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Persist progress after each page; `resume` continues a saved scan
    pub fn with_checkpoints(mut self, checkpoints: CheckpointStore, resume: bool) -> Self {
        self.checkpoints = Some(checkpoints);
        self.resume = resume;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Counters and phase, also meaningful after a failed run
    pub fn state(&self) -> &RunState {
        &self.state
    }

    fn scan_mode(&self) -> ScanMode {
        match self.options.scan_mode {
            // Nothing is deleted in a dry run, so re-querying would loop.
            ScanMode::Requery if self.options.dry_run => ScanMode::Cursor,
            mode => mode,
        }
    }

    fn validate(&self) -> BatchResult<()> {
        if self.options.page_size == 0 {
            return Err(BatchError::config("page_size must be positive"));
        }
        if self.options.max_batch_size == 0 {
            return Err(BatchError::config("max_batch_size must be positive"));
        }
        if self.options.max_batch_size > MAX_BATCH_WRITES {
            return Err(BatchError::config(format!(
                "max_batch_size {} exceeds the store limit of {} writes per batch",
                self.options.max_batch_size, MAX_BATCH_WRITES
            )));
        }
        self.options
            .retry
            .validate()
            .map_err(|msg| BatchError::config(format!("retry: {msg}")))?;
        if self.options.scan_mode == ScanMode::Requery && !self.policy.removes_documents() {
            return Err(BatchError::config(format!(
                "policy {} does not remove documents and cannot use requery scanning",
                self.policy.name()
            )));
        }
        Ok(())
    }

    fn transition(&mut self, phase: RunPhase) {
        if self.state.phase != phase {
            debug!("{} -> {}", self.state.phase, phase);
            self.state.phase = phase;
        }
    }

    fn fail(&mut self, err: BatchError) -> BatchError {
        if err.is_cancelled() {
            self.transition(RunPhase::Cancelled);
            warn!("{}", err);
        } else {
            let phase = self.state.phase;
            self.transition(RunPhase::Failed);
            error!(
                "{} on '{}' failed while {}: {}",
                self.options.job, self.options.collection, phase, err
            );
        }
        err
    }

    fn record_commit(&mut self, report: &CommitReport) {
        self.state.batches_committed += 1;
        self.state.documents_affected += report.size();
        let verb = if report.dry_run {
            "Would commit"
        } else {
            "Committed"
        };
        info!(
            "{} batch {} ({} operations); {} documents affected so far",
            verb,
            report.batch,
            report.size(),
            self.state.documents_affected
        );
    }

    async fn load_checkpoint(&self) -> BatchResult<Option<RunCheckpoint>> {
        match &self.checkpoints {
            Some(store) if self.resume && self.scan_mode() == ScanMode::Cursor => {
                store
                    .load(&self.options.job, &self.options.collection)
                    .await
            }
            _ => Ok(None),
        }
    }

    async fn save_checkpoint(
        &self,
        cursor: Option<&Cursor>,
        prior: &Option<RunCheckpoint>,
    ) -> BatchResult<()> {
        let Some(store) = &self.checkpoints else {
            return Ok(());
        };
        if self.options.dry_run || self.scan_mode() != ScanMode::Cursor {
            return Ok(());
        }

        let mut checkpoint =
            RunCheckpoint::new(self.run_id, &self.options.job, &self.options.collection);
        checkpoint.cursor = cursor.cloned();
        checkpoint.batches_committed = self.state.batches_committed
            + prior.as_ref().map_or(0, |cp| cp.batches_committed);
        checkpoint.documents_affected = self.state.documents_affected
            + prior.as_ref().map_or(0, |cp| cp.documents_affected);
        store.save(&checkpoint).await
    }

    /// Run the job to completion
    pub async fn run(&mut self) -> BatchResult<RunSummary> {
        let started = Instant::now();
        self.state = RunState::default();

        if let Err(e) = self.validate() {
            return Err(self.fail(e));
        }

        let mode = self.scan_mode();
        if mode != self.options.scan_mode {
            info!("Dry run: scanning '{}' with a cursor", self.options.collection);
        }
        info!(
            "Starting {} on '{}' with policy {} ({} store, page size {}, batch size {}{})",
            self.options.job,
            self.options.collection,
            self.policy.name(),
            self.store.backend_name(),
            self.options.page_size,
            self.options.max_batch_size,
            if self.options.dry_run { ", dry run" } else { "" }
        );

        let retry = RetryExecutor::new(self.options.retry.clone(), self.options.call_timeout);

        let store = Arc::clone(&self.store);
        if let Err(e) = retry
            .execute(|| store.health_check(), "store health check")
            .await
        {
            let err = BatchError::setup(self.store.backend_name(), e);
            return Err(self.fail(err));
        }

        let prior = match self.load_checkpoint().await {
            Ok(prior) => prior,
            Err(e) => return Err(self.fail(e)),
        };
        if let Some(cp) = &prior {
            info!(
                "Resuming {} on '{}' after {:?} ({} batches committed previously)",
                cp.job, cp.collection, cp.cursor, cp.batches_committed
            );
        }

        let mut scanner = PageScanner::new(
            Arc::clone(&self.store),
            self.options.collection.clone(),
            self.options.page_size,
            mode,
            retry.clone(),
        )
        .resume_from(prior.as_ref().and_then(|cp| cp.cursor.clone()));

        let executor = CommitExecutor::new(Arc::clone(&self.store), retry)
            .with_shutdown(self.shutdown.clone())
            .dry_run(self.options.dry_run)
            .starting_after(prior.as_ref().map_or(0, |cp| cp.batches_committed));
        let mut accumulator = BatchAccumulator::new(self.options.max_batch_size, executor);

        loop {
            self.transition(RunPhase::Scanning);
            if self.shutdown.is_shutdown_requested() {
                let err = BatchError::cancelled(format!(
                    "before fetching page {}",
                    scanner.pages_fetched() + 1
                ));
                return Err(self.fail(err));
            }

            let documents = match scanner.next_page().await {
                Ok(documents) => documents,
                Err(e) => return Err(self.fail(e)),
            };
            self.state.pages_fetched = scanner.pages_fetched();
            if documents.is_empty() {
                break;
            }

            self.transition(RunPhase::Deciding);
            self.state.documents_scanned += documents.len();
            let operations = decide_page(self.policy.as_ref(), &documents);
            debug!(
                "{} of {} documents on page {} need changes",
                operations.len(),
                documents.len(),
                scanner.pages_fetched()
            );

            if operations.is_empty() && mode == ScanMode::Requery {
                warn!(
                    "Page {} of '{}' produced no operations; stopping the requery scan",
                    scanner.pages_fetched(),
                    self.options.collection
                );
                break;
            }

            self.transition(RunPhase::Accumulating);
            for operation in operations {
                self.state.operations_queued += 1;
                match accumulator.add(operation).await {
                    Ok(Some(report)) => self.record_commit(&report),
                    Ok(None) => {}
                    Err(e) => {
                        self.transition(RunPhase::Committing);
                        return Err(self.fail(e));
                    }
                }
            }

            self.transition(RunPhase::Committing);
            match accumulator.flush_remainder().await {
                Ok(Some(report)) => self.record_commit(&report),
                Ok(None) => {}
                Err(e) => return Err(self.fail(e)),
            }

            if let Err(e) = self.save_checkpoint(scanner.cursor(), &prior).await {
                return Err(self.fail(e));
            }
        }

        self.transition(RunPhase::Draining);
        match accumulator.flush_remainder().await {
            Ok(Some(report)) => self.record_commit(&report),
            Ok(None) => {}
            Err(e) => return Err(self.fail(e)),
        }

        if let Some(store) = &self.checkpoints {
            if !self.options.dry_run {
                if let Err(e) = store
                    .clear(&self.options.job, &self.options.collection)
                    .await
                {
                    // The work is done; a stale checkpoint only costs a
                    // shorter scan next time.
                    warn!("{}", e);
                }
            }
        }

        self.transition(RunPhase::Done);
        let summary = RunSummary {
            job: self.options.job.clone(),
            collection: self.options.collection.clone(),
            policy: self.policy.name().to_string(),
            dry_run: self.options.dry_run,
            pages_fetched: self.state.pages_fetched,
            documents_scanned: self.state.documents_scanned,
            operations_queued: self.state.operations_queued,
            batches_committed: self.state.batches_committed,
            documents_affected: self.state.documents_affected,
            elapsed: started.elapsed(),
        };
        info!(
            "{} on '{}' done: documents affected: {}",
            summary.job, summary.collection, summary.documents_affected
        );
        Ok(summary)
    }
}
