//! # docbatch
//!
//! Bulk maintenance jobs for document collections: purge a collection,
//! migrate date strings to timestamps, backfill missing fields. Writes are
//! grouped into atomic batches of at most 500 operations.
//!
//! ## Usage
//!
//! ```bash
//! docbatch [-v] [-c job.toml] purge-logs [--batch-size 100] [--dry-run]
//! ```
//!
//! ## Modules
//!
//! - `batch` - Scan, decide, accumulate and commit loop with retry and cancellation
//! - `cli` - Argument parsing and command routing for the binary
//! - `config` - Job presets and TOML/environment configuration
//! - `error` - Run-level errors with stable numeric codes
//! - `store` - Document store trait with file and in-memory backends
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;
