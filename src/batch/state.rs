//! Run phases, counters and the final summary

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Phase of the run controller's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Scanning,
    Deciding,
    Accumulating,
    Committing,
    Draining,
    Done,
    Failed,
    Cancelled,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed | RunPhase::Cancelled)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Scanning => "scanning",
            RunPhase::Deciding => "deciding",
            RunPhase::Accumulating => "accumulating",
            RunPhase::Committing => "committing",
            RunPhase::Draining => "draining",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
            RunPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Counters owned by the run controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunState {
    pub phase: RunPhase,
    pub pages_fetched: usize,
    pub documents_scanned: usize,
    pub operations_queued: usize,
    pub batches_committed: usize,
    pub documents_affected: usize,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            phase: RunPhase::Scanning,
            pages_fetched: 0,
            documents_scanned: 0,
            operations_queued: 0,
            batches_committed: 0,
            documents_affected: 0,
        }
    }
}

/// Result of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub job: String,
    pub collection: String,
    pub policy: String,
    pub dry_run: bool,
    pub pages_fetched: usize,
    pub documents_scanned: usize,
    pub operations_queued: usize,
    pub batches_committed: usize,
    pub documents_affected: usize,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn nothing_to_do(&self) -> bool {
        self.operations_queued == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.dry_run { "[dry run] " } else { "" };
        writeln!(
            f,
            "{prefix}{} on '{}' finished in {:.2?}",
            self.job, self.collection, self.elapsed
        )?;
        writeln!(
            f,
            "  scanned {} documents in {} pages, {} batches committed",
            self.documents_scanned, self.pages_fetched, self.batches_committed
        )?;
        write!(f, "{prefix}documents affected: {}", self.documents_affected)
    }
}
