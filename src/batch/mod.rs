//! Batch mutation engine
//!
//! Pages through a collection, asks a [`MutationPolicy`] what each document
//! needs, and commits the resulting writes in bounded atomic batches.
//!
//! ```text
//! PageScanner -> decide_page -> BatchAccumulator -> CommitExecutor
//!                    ^                                    |
//!                    +--------- BatchRun (controller) ----+
//! ```

pub mod accumulator;
pub mod checkpoint;
pub mod controller;
pub mod executor;
pub mod policy;
pub mod retry;
pub mod scanner;
pub mod signals;
pub mod state;

pub use accumulator::BatchAccumulator;
pub use checkpoint::{CheckpointStore, RunCheckpoint};
pub use controller::{BatchRun, RunOptions};
pub use executor::{CommitExecutor, CommitReport};
pub use policy::{
    decide_page, parse_calendar_date, BackfillDefault, DeleteAll, Decision, MutationPolicy,
    NormalizeDates, PolicySpec,
};
pub use retry::{BackoffStrategy, RetryConfig, RetryExecutor};
pub use scanner::{PageScanner, ScanMode};
pub use signals::{shutdown_signal, ShutdownSignal};
pub use state::{RunPhase, RunState, RunSummary};
